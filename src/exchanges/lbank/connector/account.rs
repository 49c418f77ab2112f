use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::filter_by_since_limit;
use crate::core::precision::format_decimal;
use crate::core::safe;
use crate::core::traits::AccountInfo;
use crate::core::types::{
    Balances, DepositAddress, DepositWithdrawFee, FetchParams, Fee, Params, Transaction, TransactionStatus,
    TransactionType, WithdrawRequest,
};
use crate::exchanges::lbank::conversions::{
    convert_lbank_balance, convert_lbank_deposit_address, convert_lbank_private_fees, convert_lbank_public_fees,
    convert_lbank_transaction,
};
use crate::exchanges::lbank::requests::{network_id, withdraw_request};
use crate::exchanges::lbank::rest::LbankRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// LBank balances, deposits and withdrawals.
pub struct Account<R: RestClient> {
    rest: LbankRest<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &LbankRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Account<R> {
    async fn fetch_transactions(
        &self,
        path: &str,
        list_key: &str,
        code: Option<&str>,
        params: &FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = params.extra.clone();
        if let Some(code) = code {
            request.insert("coin".to_string(), json!(self.rest.markets().currency_id(code).to_lowercase()));
        }
        if let Some(since) = params.since {
            request.insert("startTime".to_string(), json!(since));
        }
        let response = self.rest.private(path, request).await?;
        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        let networks_by_id = &self.rest.descriptor().options.networks_by_id;
        let transactions = safe::array(data, list_key)
            .iter()
            .map(|raw| convert_lbank_transaction(self.rest.markets(), raw, networks_by_id))
            .filter(|tx| code.map_or(true, |c| tx.currency.as_deref() == Some(c)))
            .collect();
        Ok(filter_by_since_limit(transactions, params))
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for Account<R> {
    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        let response = self
            .rest
            .private("supplement/user_info", Params::new())
            .await
            .with_exchange_context("lbank", "fetch_balance")?;
        Ok(convert_lbank_balance(self.rest.markets(), &response))
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_deposits(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("supplement/deposit_history", "depositOrders", code, &params)
            .await
            .with_exchange_context("lbank", "fetch_deposits")
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("supplement/withdraws", "withdraws", code, &params)
            .await
            .with_exchange_context("lbank", "fetch_withdrawals")
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_deposit_address(&self, code: &str, network: Option<&str>) -> Result<DepositAddress, ExchangeError> {
        self.rest.ensure_markets().await?;
        let options = &self.rest.descriptor().options;
        let mut request = Params::new();
        request.insert(
            "assetCode".to_string(),
            json!(self.rest.markets().currency_id(code).to_lowercase()),
        );
        if let Some(network) = network_id(options, code, network) {
            request.insert("netWork".to_string(), json!(network));
        }
        let response = self.rest.private("get_deposit_address", request).await?;
        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        convert_lbank_deposit_address(data, code, &options.networks_by_id).ok_or_else(|| {
            ExchangeError::InvalidAddress(format!("lbank returned no {} deposit address", code))
        })
    }

    #[instrument(skip(self, request), fields(exchange = "lbank", code = %request.code))]
    async fn withdraw(&self, request: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = self.rest.markets().currency_id(&request.code).to_lowercase();
        let params = withdraw_request(&self.rest.descriptor().options, &currency_id, &request)?;
        let response = self
            .rest
            .private("supplement/withdraw", params)
            .await
            .with_exchange_context("lbank", "withdraw")?;

        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        let transaction = Transaction {
            id: safe::string(data, "withdrawId"),
            transaction_type: Some(TransactionType::Withdrawal),
            currency: Some(request.code.clone()),
            amount: Some(request.amount),
            address: Some(request.address.clone()),
            address_to: Some(request.address.clone()),
            tag: request.tag.clone(),
            status: Some(TransactionStatus::Pending),
            fee: safe::decimal(data, "fee").map(|cost| Fee {
                cost: Some(cost),
                currency: Some(request.code.clone()),
                rate: None,
            }),
            info: response.clone(),
            ..Transaction::default()
        };
        info!(
            withdraw_id = ?transaction.id,
            amount = %format_decimal(request.amount),
            "Submitted lbank withdrawal"
        );
        Ok(transaction)
    }

    /// Per-network fees from the account when credentials are configured,
    /// otherwise from the public withdrawal configuration.
    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_deposit_withdraw_fees(
        &self,
        codes: Option<&[String]>,
    ) -> Result<BTreeMap<String, DepositWithdrawFee>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let networks_by_id = &self.rest.descriptor().options.networks_by_id;
        if self.rest.has_credentials() {
            let response = self.rest.private("supplement/user_info", Params::new()).await?;
            return Ok(convert_lbank_private_fees(
                self.rest.markets(),
                safe::array(&response, "data"),
                codes,
                networks_by_id,
            ));
        }

        let response = self.rest.public("withdrawConfigs", Params::new()).await?;
        Ok(convert_lbank_public_fees(
            self.rest.markets(),
            safe::array(&response, "data"),
            codes,
            networks_by_id,
        ))
    }
}
