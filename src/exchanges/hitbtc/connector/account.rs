use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::filter_by_since_limit;
use crate::core::precision::format_decimal;
use crate::core::safe;
use crate::core::traits::AccountInfo;
use crate::core::types::{
    Balances, DepositAddress, DepositWithdrawFee, FetchParams, Params, Position, Transaction, TransactionType,
    Transfer, TransferRequest, WithdrawRequest,
};
use crate::exchanges::hitbtc::conversions::{
    convert_hitbtc_balance, convert_hitbtc_deposit_address, convert_hitbtc_deposit_withdraw_fee,
    convert_hitbtc_position, convert_hitbtc_transaction,
};
use crate::exchanges::hitbtc::requests::{account_id, network_id, transactions_request, transfer_request, withdraw_request};
use crate::exchanges::hitbtc::rest::HitbtcRest;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// HitBTC wallet, trading-account balances and margin positions.
pub struct Account<R: RestClient> {
    rest: HitbtcRest<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &HitbtcRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Account<R> {
    /// Balances of one account: `spot`, `wallet` (funding) or
    /// `derivatives` (swap and future). Unified account names are mapped.
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    pub async fn fetch_balance_for(&self, account: &str) -> Result<Balances, ExchangeError> {
        let path = match account_id(&self.rest.descriptor().options, account).as_str() {
            "spot" => "spot/balance",
            "wallet" => "wallet/balance",
            "derivatives" => "futures/balance",
            other => {
                return Err(ExchangeError::BadRequest(format!(
                    "hitbtc fetch_balance() account must be spot, funding or swap, got {}",
                    other
                )))
            }
        };
        self.rest.ensure_markets().await?;
        let response = self
            .rest
            .private(Method::GET, path, Params::new())
            .await
            .with_exchange_context("hitbtc", "fetch_balance")?;
        Ok(convert_hitbtc_balance(self.rest.markets(), &response))
    }

    async fn fetch_transactions(
        &self,
        kind: &str,
        code: Option<&str>,
        params: &FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = code.map(|c| self.rest.markets().currency_id(c));
        let mut request = transactions_request(kind, currency_id.as_deref(), params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self
            .rest
            .private(Method::GET, "wallet/transactions", request)
            .await?;
        let transactions = response
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|raw| convert_hitbtc_transaction(self.rest.markets(), raw))
            .collect();
        Ok(filter_by_since_limit(transactions, params))
    }

    async fn fetch_account_positions(&self, path: &str) -> Result<Vec<Position>, ExchangeError> {
        let response = self.rest.private(Method::GET, path, Params::new()).await?;
        Ok(response
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| convert_hitbtc_position(self.rest.markets(), raw))
            .collect())
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for Account<R> {
    /// Spot trading balances; see [`Account::fetch_balance_for`] for the
    /// other accounts.
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.fetch_balance_for("spot").await
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_deposits(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("DEPOSIT", code, &params)
            .await
            .with_exchange_context("hitbtc", "fetch_deposits")
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("WITHDRAW", code, &params)
            .await
            .with_exchange_context("hitbtc", "fetch_withdrawals")
    }

    /// USDT addresses are requested under the network's own currency id.
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_deposit_address(&self, code: &str, network: Option<&str>) -> Result<DepositAddress, ExchangeError> {
        self.rest.ensure_markets().await?;
        let options = &self.rest.descriptor().options;
        let currency_id = match network {
            Some(network) if code == "USDT" => network_id(options, network),
            _ => self.rest.markets().currency_id(code),
        };
        let mut request = Params::new();
        request.insert("currency".to_string(), json!(currency_id));
        let response = self
            .rest
            .private(Method::GET, "wallet/crypto/address", request)
            .await
            .with_exchange_context("hitbtc", "fetch_deposit_address")?;
        response
            .as_array()
            .and_then(|entries| entries.first())
            .and_then(|raw| convert_hitbtc_deposit_address(self.rest.markets(), raw, code, network))
            .ok_or_else(|| ExchangeError::InvalidAddress(format!("hitbtc returned no {} deposit address", code)))
    }

    #[instrument(skip(self, request), fields(exchange = "hitbtc", code = %request.code))]
    async fn withdraw(&self, request: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = self.rest.markets().currency_id(&request.code);
        let body = withdraw_request(&self.rest.descriptor().options, &currency_id, &request);
        let response = self
            .rest
            .private(Method::POST, "wallet/crypto/withdraw", body)
            .await
            .with_exchange_context("hitbtc", "withdraw")?;

        let transaction = Transaction {
            id: safe::string(&response, "id"),
            transaction_type: Some(TransactionType::Withdrawal),
            currency: Some(request.code.clone()),
            network: request.network.clone(),
            amount: Some(request.amount),
            address: Some(request.address.clone()),
            address_to: Some(request.address.clone()),
            tag: request.tag.clone(),
            info: response.clone(),
            ..Transaction::default()
        };
        info!(
            withdraw_id = ?transaction.id,
            amount = %format_decimal(request.amount),
            "Submitted hitbtc withdrawal"
        );
        Ok(transaction)
    }

    #[instrument(skip(self, request), fields(exchange = "hitbtc", code = %request.code))]
    async fn transfer(&self, request: TransferRequest) -> Result<Transfer, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = self.rest.markets().currency_id(&request.code);
        let body = transfer_request(&self.rest.descriptor().options, &currency_id, &request)?;
        let response = self
            .rest
            .private(Method::POST, "wallet/transfer", body)
            .await
            .with_exchange_context("hitbtc", "transfer")?;

        let id = match &response {
            Value::Array(ids) => ids.first().and_then(|id| id.as_str().map(str::to_string)),
            other => safe::string(other, "id"),
        };
        info!(transfer_id = ?id, from = %request.from_account, to = %request.to_account, "Transferred hitbtc funds");
        Ok(Transfer {
            id,
            currency: Some(request.code.clone()),
            amount: Some(request.amount),
            from_account: Some(request.from_account.clone()),
            to_account: Some(request.to_account.clone()),
            info: response,
            ..Transfer::default()
        })
    }

    /// Open positions across the futures and margin accounts.
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let (futures, margin) = tokio::try_join!(
            self.fetch_account_positions("futures/account"),
            self.fetch_account_positions("margin/account"),
        )
        .with_exchange_context("hitbtc", "fetch_positions")?;
        Ok(futures.into_iter().chain(margin).collect())
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_deposit_withdraw_fees(
        &self,
        codes: Option<&[String]>,
    ) -> Result<BTreeMap<String, DepositWithdrawFee>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let response = self.rest.public("public/currency", Params::new()).await?;
        let networks_by_id = &self.rest.descriptor().options.networks_by_id;

        let mut fees = BTreeMap::new();
        for (id, raw) in response.as_object().into_iter().flatten() {
            let code = self.rest.markets().safe_currency_code(id);
            if codes.is_some_and(|wanted| !wanted.contains(&code)) {
                continue;
            }
            fees.insert(code, convert_hitbtc_deposit_withdraw_fee(raw, networks_by_id));
        }
        Ok(fees)
    }
}
