use crate::core::config::ExchangeDescriptor;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::{AccountInfo, ExchangeConnector, FundingRateSource, MarketDataSource, OrderPlacer};
use crate::core::types::{
    Balances, Currency, DepositAddress, DepositWithdrawFee, EditOrderRequest, FetchParams, FundingRate, Market,
    Ohlcv, Order, OrderBook, OrderRequest, Position, Ticker, Trade, Transaction, Transfer, TransferRequest,
    WithdrawRequest,
};
use crate::exchanges::hitbtc::rest::HitbtcRest;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod account;
pub mod market_data;
pub mod trading;

pub use account::Account;
pub use market_data::MarketData;
pub use trading::Trading;

/// HitBTC connector that composes all sub-trait implementations
pub struct HitbtcConnector<R: RestClient> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    pub account: Account<R>,
    rest: HitbtcRest<R>,
}

impl<R: RestClient + Clone> HitbtcConnector<R> {
    pub fn new(rest: HitbtcRest<R>) -> Self {
        Self {
            market: MarketData::new(&rest),
            trading: Trading::new(&rest),
            account: Account::new(&rest),
            rest,
        }
    }

    pub fn rest(&self) -> &HitbtcRest<R> {
        &self.rest
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for HitbtcConnector<R> {
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        self.market.load_markets(reload).await
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.market.fetch_markets().await
    }

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        self.market.fetch_currencies().await
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        self.market.fetch_ticker(symbol).await
    }

    async fn fetch_tickers(&self, symbols: Option<&[String]>) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.market.fetch_tickers(symbols).await
    }

    async fn fetch_order_book(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBook, ExchangeError> {
        self.market.fetch_order_book(symbol, limit).await
    }

    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        self.market.fetch_trades(symbol, params).await
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        params: FetchParams,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        self.market.fetch_ohlcv(symbol, timeframe, params).await
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for HitbtcConnector<R> {
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError> {
        self.trading.create_order(order).await
    }

    async fn edit_order(&self, order: EditOrderRequest) -> Result<Order, ExchangeError> {
        self.trading.edit_order(order).await
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.trading.cancel_order(id, symbol).await
    }

    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        self.trading.cancel_all_orders(symbol).await
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.trading.fetch_order(id, symbol).await
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Order>, ExchangeError> {
        self.trading.fetch_open_orders(symbol, params).await
    }

    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.trading.fetch_closed_orders(symbol, params).await
    }

    async fn fetch_my_trades(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        self.trading.fetch_my_trades(symbol, params).await
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for HitbtcConnector<R> {
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.account.fetch_balance().await
    }

    async fn fetch_deposits(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<Transaction>, ExchangeError> {
        self.account.fetch_deposits(code, params).await
    }

    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.account.fetch_withdrawals(code, params).await
    }

    async fn fetch_deposit_address(&self, code: &str, network: Option<&str>) -> Result<DepositAddress, ExchangeError> {
        self.account.fetch_deposit_address(code, network).await
    }

    async fn withdraw(&self, request: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.account.withdraw(request).await
    }

    async fn transfer(&self, request: TransferRequest) -> Result<Transfer, ExchangeError> {
        self.account.transfer(request).await
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.account.fetch_positions().await
    }

    async fn fetch_deposit_withdraw_fees(
        &self,
        codes: Option<&[String]>,
    ) -> Result<BTreeMap<String, DepositWithdrawFee>, ExchangeError> {
        self.account.fetch_deposit_withdraw_fees(codes).await
    }
}

#[async_trait]
impl<R: RestClient> FundingRateSource for HitbtcConnector<R> {
    async fn fetch_funding_rate(&self, symbol: &str) -> Result<FundingRate, ExchangeError> {
        self.market.fetch_funding_rate(symbol).await
    }

    async fn fetch_funding_rates(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, FundingRate>, ExchangeError> {
        self.market.fetch_funding_rates(symbols).await
    }
}

impl<R: RestClient> ExchangeConnector for HitbtcConnector<R> {
    fn descriptor(&self) -> &ExchangeDescriptor {
        self.rest.descriptor()
    }
}
