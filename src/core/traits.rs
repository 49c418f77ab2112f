use crate::core::{
    config::ExchangeDescriptor,
    errors::ExchangeError,
    types::{
        Balances, Currency, DepositAddress, DepositWithdrawFee, EditOrderRequest, ExchangeStatus,
        FetchParams, FundingRate, LedgerEntry, Market, Ohlcv, Order, OrderBook, OrderRequest,
        Position, Ticker, Trade, Transaction, Transfer, TransferRequest, WithdrawRequest,
    },
};
use async_trait::async_trait;
use std::collections::BTreeMap;

fn not_supported<T>(operation: &str) -> Result<T, ExchangeError> {
    Err(ExchangeError::NotSupported(format!(
        "{} is not supported",
        operation
    )))
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Populate the market cache once; `reload` forces a refetch.
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError>;

    /// Fetch every market from the exchange without touching the cache.
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError>;

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        not_supported("fetch_currencies")
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    /// Tickers keyed by unified symbol. `None` means all markets.
    async fn fetch_tickers(
        &self,
        _symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        not_supported("fetch_tickers")
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<OrderBook, ExchangeError>;

    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError>;

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _params: FetchParams,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        not_supported("fetch_ohlcv")
    }

    /// Server time in milliseconds.
    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        not_supported("fetch_time")
    }

    async fn fetch_status(&self) -> Result<ExchangeStatus, ExchangeError> {
        not_supported("fetch_status")
    }
}

#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError>;

    async fn edit_order(&self, _order: EditOrderRequest) -> Result<Order, ExchangeError> {
        not_supported("edit_order")
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError>;

    async fn cancel_orders(
        &self,
        _ids: &[String],
        _symbol: Option<&str>,
    ) -> Result<Vec<Order>, ExchangeError> {
        not_supported("cancel_orders")
    }

    async fn cancel_all_orders(&self, _symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        not_supported("cancel_all_orders")
    }

    /// Dead man's switch: cancel everything after `timeout_ms` unless re-armed.
    async fn cancel_all_orders_after(&self, _timeout_ms: i64) -> Result<serde_json::Value, ExchangeError> {
        not_supported("cancel_all_orders_after")
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError>;

    async fn fetch_open_orders(
        &self,
        _symbol: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        not_supported("fetch_open_orders")
    }

    async fn fetch_closed_orders(
        &self,
        _symbol: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        not_supported("fetch_closed_orders")
    }

    async fn fetch_my_trades(
        &self,
        _symbol: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<Trade>, ExchangeError> {
        not_supported("fetch_my_trades")
    }
}

#[async_trait]
pub trait AccountInfo: Send + Sync {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError>;

    async fn fetch_deposits(
        &self,
        _code: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        not_supported("fetch_deposits")
    }

    async fn fetch_withdrawals(
        &self,
        _code: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        not_supported("fetch_withdrawals")
    }

    async fn fetch_deposit_address(
        &self,
        _code: &str,
        _network: Option<&str>,
    ) -> Result<DepositAddress, ExchangeError> {
        not_supported("fetch_deposit_address")
    }

    async fn withdraw(&self, _request: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        not_supported("withdraw")
    }

    async fn transfer(&self, _request: TransferRequest) -> Result<Transfer, ExchangeError> {
        not_supported("transfer")
    }

    async fn fetch_ledger(
        &self,
        _code: Option<&str>,
        _params: FetchParams,
    ) -> Result<Vec<LedgerEntry>, ExchangeError> {
        not_supported("fetch_ledger")
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        not_supported("fetch_positions")
    }

    async fn fetch_deposit_withdraw_fees(
        &self,
        _codes: Option<&[String]>,
    ) -> Result<BTreeMap<String, DepositWithdrawFee>, ExchangeError> {
        not_supported("fetch_deposit_withdraw_fees")
    }
}

#[async_trait]
pub trait FundingRateSource: Send + Sync {
    async fn fetch_funding_rate(&self, _symbol: &str) -> Result<FundingRate, ExchangeError> {
        not_supported("fetch_funding_rate")
    }

    async fn fetch_funding_rates(
        &self,
        _symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, FundingRate>, ExchangeError> {
        not_supported("fetch_funding_rates")
    }
}

/// Composite of every capability family plus the static descriptor.
pub trait ExchangeConnector: MarketDataSource + OrderPlacer + AccountInfo + FundingRateSource {
    fn descriptor(&self) -> &ExchangeDescriptor;
}
