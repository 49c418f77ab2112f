use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{filter_by_since_limit, paginate, PageRequest, PaginationMode, DEFAULT_MAX_PAGES};
use crate::core::precision::format_decimal;
use crate::core::traits::AccountInfo;
use crate::core::types::{
    Balances, FetchParams, Params, Transaction, TransactionType, Transfer, TransferRequest, WithdrawRequest,
};
use crate::exchanges::novadax::conversions::{convert_novadax_balance, convert_novadax_transaction};
use crate::exchanges::novadax::requests::{transactions_request, transfer_request, withdraw_request};
use crate::exchanges::novadax::rest::NovadaxRest;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{info, instrument};

/// Id-like payloads come back either as the bare `data` string or as an
/// object holding an `id`.
fn returned_id(data: &Value) -> Option<String> {
    match data {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        other => crate::core::safe::string(other, "id"),
    }
}

/// NovaDAX balances, wallet history and sub-account transfers.
pub struct Account<R: RestClient> {
    rest: NovadaxRest<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &NovadaxRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Account<R> {
    async fn fetch_transactions_page(
        &self,
        kind: &str,
        currency_id: Option<&str>,
        page: PageRequest,
        extra: &Params,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let mut request = transactions_request(kind, currency_id, page.limit, page.cursor.as_deref());
        request.extend(extra.clone());
        let data = self
            .rest
            .private(Method::GET, "wallet/query/deposit-withdraw", request)
            .await?;
        Ok(data
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|raw| convert_novadax_transaction(self.rest.markets(), raw))
            .collect())
    }

    /// `kind` is `coin_in` or `coin_out`. Later pages start after the id of
    /// the last entry.
    async fn fetch_transactions(
        &self,
        kind: &str,
        code: Option<&str>,
        params: &FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = code.map(|c| self.rest.markets().currency_id(c));
        let currency_id = currency_id.as_deref();
        let extra = &params.extra;

        if !params.paginate {
            let page = PageRequest {
                limit: params.limit,
                ..PageRequest::default()
            };
            let transactions = self.fetch_transactions_page(kind, currency_id, page, extra).await?;
            return Ok(filter_by_since_limit(transactions, params));
        }

        let mode = PaginationMode::Cursor {
            field: "id".to_string(),
        };
        paginate(&mode, params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_transactions_page(kind, currency_id, page, extra)
        })
        .await
    }

    /// Sub accounts of the master account, as returned by `account/subs`.
    #[instrument(skip(self), fields(exchange = "novadax"))]
    pub async fn fetch_accounts(&self) -> Result<Vec<Value>, ExchangeError> {
        let data = self
            .rest
            .private(Method::GET, "account/subs", Params::new())
            .await
            .with_exchange_context("novadax", "fetch_accounts")?;
        Ok(data.as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for Account<R> {
    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.rest.ensure_markets().await?;
        let data = self
            .rest
            .private(Method::GET, "account/getBalance", Params::new())
            .await
            .with_exchange_context("novadax", "fetch_balance")?;
        Ok(convert_novadax_balance(self.rest.markets(), &data))
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_deposits(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("coin_in", code, &params)
            .await
            .with_exchange_context("novadax", "fetch_deposits")
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.fetch_transactions("coin_out", code, &params)
            .await
            .with_exchange_context("novadax", "fetch_withdrawals")
    }

    #[instrument(skip(self, request), fields(exchange = "novadax", code = %request.code))]
    async fn withdraw(&self, request: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = self.rest.markets().currency_id(&request.code);
        let body = withdraw_request(&currency_id, &request);
        let data = self
            .rest
            .private(Method::POST, "wallet/withdraw/coin", body)
            .await
            .with_exchange_context("novadax", "withdraw")?;

        let transaction = Transaction {
            id: returned_id(&data),
            transaction_type: Some(TransactionType::Withdrawal),
            currency: Some(request.code.clone()),
            network: request.network.clone(),
            amount: Some(request.amount),
            address: Some(request.address.clone()),
            address_to: Some(request.address.clone()),
            tag: request.tag.clone(),
            tag_to: request.tag.clone(),
            info: data,
            ..Transaction::default()
        };
        info!(
            withdraw_id = ?transaction.id,
            amount = %format_decimal(request.amount),
            "Submitted novadax withdrawal"
        );
        Ok(transaction)
    }

    /// Moves funds between the master account (`main`) and a sub account
    /// named by its id.
    #[instrument(skip(self, request), fields(exchange = "novadax", code = %request.code))]
    async fn transfer(&self, request: TransferRequest) -> Result<Transfer, ExchangeError> {
        self.rest.ensure_markets().await?;
        let currency_id = self.rest.markets().currency_id(&request.code);
        let body = transfer_request(&currency_id, &request)?;
        let data = self
            .rest
            .private(Method::POST, "account/subs/transfer", body)
            .await
            .with_exchange_context("novadax", "transfer")?;

        let id = returned_id(&data);
        info!(transfer_id = ?id, from = %request.from_account, to = %request.to_account, "Transferred novadax funds");
        Ok(Transfer {
            id,
            currency: Some(request.code.clone()),
            amount: Some(request.amount),
            from_account: Some(request.from_account.clone()),
            to_account: Some(request.to_account.clone()),
            info: data,
            ..Transfer::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_from_bare_or_object_data() {
        assert_eq!(returned_id(&json!("123")).as_deref(), Some("123"));
        assert_eq!(returned_id(&json!(456)).as_deref(), Some("456"));
        assert_eq!(returned_id(&json!({"id": "789"})).as_deref(), Some("789"));
        assert_eq!(returned_id(&Value::Null), None);
    }
}
