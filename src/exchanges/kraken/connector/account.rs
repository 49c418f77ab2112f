use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{filter_by_since_limit, paginate, PageRequest, PaginationMode, DEFAULT_MAX_PAGES};
use crate::core::precision::format_decimal;
use crate::core::safe;
use crate::core::traits::AccountInfo;
use crate::core::types::{
    Balances, DepositAddress, FetchParams, LedgerEntry, Params, Position, Transaction, TransactionType,
    Transfer, TransferRequest, WithdrawRequest,
};
use crate::exchanges::kraken::conversions::{
    convert_kraken_balance, convert_kraken_deposit_address, convert_kraken_ledger_entry,
    convert_kraken_position, convert_kraken_transaction, convert_kraken_transfer, keyed_entries,
    withdrawals_with_cursor,
};
use crate::exchanges::kraken::requests::funding_window;
use crate::exchanges::kraken::rest::KrakenRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Kraken balances, funding and ledger.
pub struct Account<R: RestClient> {
    rest: KrakenRest<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &KrakenRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Account<R> {
    fn funding_request(&self, code: Option<&str>, extra: &Params) -> Params {
        let mut request = extra.clone();
        if let Some(code) = code {
            request.insert("asset".to_string(), json!(self.rest.markets().currency_id(code)));
        }
        request
    }

    async fn fetch_withdrawal_page(
        &self,
        code: Option<&str>,
        page: PageRequest,
        extra: &Params,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        let mut request = self.funding_request(code, extra);
        funding_window(&mut request, page.since, page.until);
        match page.cursor {
            Some(cursor) => request.insert("cursor".to_string(), json!(cursor)),
            None => request.insert("cursor".to_string(), json!(true)),
        };
        let result = self.rest.private("WithdrawStatus", request).await?;
        Ok(withdrawals_with_cursor(&result)
            .iter()
            .map(|raw| {
                convert_kraken_transaction(self.rest.markets(), raw, Some(TransactionType::Withdrawal), code)
            })
            .collect())
    }

    /// Unified network code to the name Kraken uses in its deposit methods.
    fn network_id(&self, network: &str) -> String {
        self.rest
            .descriptor()
            .options
            .networks
            .get(network)
            .cloned()
            .unwrap_or_else(|| network.to_string())
            .to_uppercase()
    }

    fn account_id(&self, account: &str) -> String {
        self.rest
            .descriptor()
            .options
            .accounts_by_type
            .get(account)
            .cloned()
            .unwrap_or_else(|| account.to_string())
    }
}

#[async_trait]
impl<R: RestClient> AccountInfo for Account<R> {
    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_balance(&self) -> Result<Balances, ExchangeError> {
        self.rest.ensure_markets().await?;
        let result = self
            .rest
            .private("BalanceEx", Params::new())
            .await
            .with_exchange_context("kraken", "fetch_balance")?;
        Ok(convert_kraken_balance(self.rest.markets(), &result))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_deposits(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<Transaction>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = self.funding_request(code, &params.extra);
        funding_window(&mut request, params.since, params.until);
        let result = self.rest.private("DepositStatus", request).await?;

        let entries = match &result {
            Value::Array(items) => items.clone(),
            other => safe::array(other, "deposit").to_vec(),
        };
        let deposits = entries
            .iter()
            .map(|raw| convert_kraken_transaction(self.rest.markets(), raw, Some(TransactionType::Deposit), code))
            .collect();
        Ok(filter_by_since_limit(deposits, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_withdrawals(
        &self,
        code: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Transaction>, ExchangeError> {
        self.rest.ensure_markets().await?;
        if !params.paginate {
            let first = PageRequest {
                since: params.since,
                until: params.until,
                ..PageRequest::default()
            };
            let withdrawals = self.fetch_withdrawal_page(code, first, &params.extra).await?;
            return Ok(filter_by_since_limit(withdrawals, &params));
        }

        let mode = PaginationMode::Cursor {
            field: "next_cursor".to_string(),
        };
        let extra = &params.extra;
        paginate(&mode, &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_withdrawal_page(code, page, extra)
        })
        .await
        .with_exchange_context("kraken", "fetch_withdrawals")
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_deposit_address(&self, code: &str, network: Option<&str>) -> Result<DepositAddress, ExchangeError> {
        self.rest.ensure_markets().await?;
        let asset = self.rest.markets().currency_id(code);

        let mut request = Params::new();
        request.insert("asset".to_string(), json!(asset));
        let methods = self.rest.private("DepositMethods", request.clone()).await?;
        let methods = methods.as_array().cloned().unwrap_or_default();
        let wanted = network.map(|n| self.network_id(n));
        let method = wanted
            .as_deref()
            .and_then(|network| {
                methods.iter().find(|m| {
                    safe::string(m, "method").is_some_and(|name| name.to_uppercase().contains(network))
                })
            })
            .or_else(|| methods.first())
            .and_then(|m| safe::string(m, "method"))
            .ok_or_else(|| {
                ExchangeError::InvalidAddress(format!("kraken has no deposit method for {}", code))
            })?;

        request.insert("method".to_string(), json!(method));
        let result = self.rest.private("DepositAddresses", request).await?;
        let first = result.as_array().and_then(|entries| entries.first()).ok_or_else(|| {
            ExchangeError::InvalidAddress(format!(
                "kraken returned no deposit address for {} via {}",
                code, method
            ))
        })?;
        let mut address = convert_kraken_deposit_address(first, code)?;
        address.network = network.map(str::to_string);
        Ok(address)
    }

    #[instrument(skip(self, withdrawal), fields(exchange = "kraken", code = %withdrawal.code))]
    async fn withdraw(&self, withdrawal: WithdrawRequest) -> Result<Transaction, ExchangeError> {
        if !withdrawal.params.contains_key("key") {
            return Err(ExchangeError::Exchange(
                "kraken withdraw() requires a key parameter naming a withdrawal key set up on your account"
                    .to_string(),
            ));
        }
        self.rest.ensure_markets().await?;
        let mut request = withdrawal.params.clone();
        request.insert("asset".to_string(), json!(self.rest.markets().currency_id(&withdrawal.code)));
        request.insert("amount".to_string(), json!(format_decimal(withdrawal.amount)));
        request.insert("address".to_string(), json!(withdrawal.address));

        let result = self
            .rest
            .private("Withdraw", request)
            .await
            .with_exchange_context("kraken", "withdraw")?;
        let mut transaction = convert_kraken_transaction(
            self.rest.markets(),
            &result,
            Some(TransactionType::Withdrawal),
            Some(&withdrawal.code),
        );
        transaction.amount = Some(withdrawal.amount);
        transaction.address = Some(withdrawal.address);
        info!(refid = ?transaction.id, "Submitted kraken withdrawal");
        Ok(transaction)
    }

    #[instrument(skip(self, transfer), fields(exchange = "kraken", code = %transfer.code))]
    async fn transfer(&self, transfer: TransferRequest) -> Result<Transfer, ExchangeError> {
        let from = self.account_id(&transfer.from_account);
        let to = self.account_id(&transfer.to_account);
        if from != "Spot Wallet" {
            return Err(ExchangeError::BadRequest(format!(
                "kraken can only transfer from the spot wallet, not {}",
                transfer.from_account
            )));
        }
        self.rest.ensure_markets().await?;

        let mut request = transfer.params.clone();
        request.insert("asset".to_string(), json!(self.rest.markets().currency_id(&transfer.code)));
        request.insert("amount".to_string(), json!(format_decimal(transfer.amount)));
        request.insert("from".to_string(), json!(from));
        request.insert("to".to_string(), json!(to));
        let result = self.rest.private("WalletTransfer", request).await?;

        let mut converted = convert_kraken_transfer(&result, &transfer.code);
        converted.amount = Some(transfer.amount);
        converted.from_account = Some(transfer.from_account);
        converted.to_account = Some(transfer.to_account);
        Ok(converted)
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_ledger(&self, code: Option<&str>, params: FetchParams) -> Result<Vec<LedgerEntry>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = self.funding_request(code, &params.extra);
        funding_window(&mut request, params.since, params.until);
        let result = self.rest.private("Ledgers", request).await?;

        let entries = keyed_entries(safe::value(&result, "ledger"))
            .iter()
            .map(|raw| convert_kraken_ledger_entry(self.rest.markets(), raw))
            .collect();
        Ok(filter_by_since_limit(entries, &params))
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = Params::new();
        request.insert("docalcs".to_string(), json!("true"));
        request.insert("consolidation".to_string(), json!("market"));
        let result = self.rest.private("OpenPositions", request).await?;

        let entries: Vec<Value> = match result {
            Value::Array(items) => items,
            Value::Object(map) => map.into_values().collect(),
            _ => Vec::new(),
        };
        Ok(entries
            .iter()
            .map(|raw| convert_kraken_position(self.rest.markets(), raw))
            .collect())
    }
}
