use crate::core::errors::ExchangeError;
use crate::core::types::{Currency, Market};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<String, Arc<Market>>,
    by_symbol: HashMap<String, Arc<Market>>,
    by_alt_name: HashMap<String, Arc<Market>>,
    delisted: HashMap<String, Arc<Market>>,
    currencies_by_code: HashMap<String, Arc<Currency>>,
    currencies_by_id: HashMap<String, Arc<Currency>>,
    learned_aliases: HashMap<String, String>,
    loaded: bool,
}

/// Process-shared market and currency tables for one adapter.
///
/// Reads vastly outnumber writes; a reload swaps whole tables under the
/// write lock so readers never observe a partially populated index.
#[derive(Debug)]
pub struct MarketCache {
    tables: RwLock<Tables>,
    common_currencies: BTreeMap<String, String>,
}

impl MarketCache {
    pub fn new(common_currencies: BTreeMap<String, String>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            common_currencies,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.tables.read().loaded
    }

    /// Replace every market index at once.
    pub fn replace_all(&self, markets: Vec<Market>) {
        let mut by_id = HashMap::with_capacity(markets.len());
        let mut by_symbol = HashMap::with_capacity(markets.len());
        let mut by_alt_name = HashMap::new();
        for market in markets {
            let market = Arc::new(market);
            for alt in &market.alt_names {
                by_alt_name.insert(alt.clone(), Arc::clone(&market));
            }
            by_symbol.insert(market.symbol().to_string(), Arc::clone(&market));
            by_id.insert(market.id.clone(), market);
        }
        debug!(markets = by_id.len(), "Market table replaced");

        let mut tables = self.tables.write();
        tables.by_id = by_id;
        tables.by_symbol = by_symbol;
        tables.by_alt_name = by_alt_name;
        tables.loaded = true;
    }

    pub fn replace_currencies(&self, currencies: Vec<Currency>) {
        let mut by_code = HashMap::with_capacity(currencies.len());
        let mut by_id = HashMap::with_capacity(currencies.len());
        for currency in currencies {
            let currency = Arc::new(currency);
            by_id.insert(currency.id.clone(), Arc::clone(&currency));
            by_code.insert(currency.code.clone(), currency);
        }

        let mut tables = self.tables.write();
        tables.currencies_by_code = by_code;
        tables.currencies_by_id = by_id;
    }

    /// Record that exchange currency `id` stands for unified `code`.
    pub fn learn_alias(&self, id: impl Into<String>, code: impl Into<String>) {
        self.tables.write().learned_aliases.insert(id.into(), code.into());
    }

    /// Drop every table, including learned aliases and delisted markets.
    pub fn clear(&self) {
        *self.tables.write() = Tables::default();
    }

    pub fn get(&self, id: &str) -> Option<Arc<Market>> {
        self.tables.read().by_id.get(id).cloned()
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<Arc<Market>> {
        self.tables.read().by_symbol.get(symbol).cloned()
    }

    pub fn by_alt_name(&self, name: &str) -> Option<Arc<Market>> {
        self.tables.read().by_alt_name.get(name).cloned()
    }

    /// Market for a unified symbol, or `BadSymbol`.
    pub fn market(&self, symbol: &str) -> Result<Arc<Market>, ExchangeError> {
        if !self.is_loaded() {
            return Err(ExchangeError::Exchange(
                "markets not loaded, call load_markets() first".to_string(),
            ));
        }
        self.by_symbol(symbol)
            .ok_or_else(|| ExchangeError::BadSymbol(format!("market symbol {} not found", symbol)))
    }

    /// Every loaded market ordered by symbol.
    pub fn get_all(&self) -> Vec<Arc<Market>> {
        let mut markets: Vec<_> = self.tables.read().by_id.values().cloned().collect();
        markets.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        markets
    }

    pub fn currency(&self, code: &str) -> Option<Arc<Currency>> {
        self.tables.read().currencies_by_code.get(code).cloned()
    }

    pub fn currency_by_id(&self, id: &str) -> Option<Arc<Currency>> {
        self.tables.read().currencies_by_id.get(id).cloned()
    }

    pub fn currencies(&self) -> Vec<Arc<Currency>> {
        let mut currencies: Vec<_> = self
            .tables
            .read()
            .currencies_by_code
            .values()
            .cloned()
            .collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        currencies
    }

    /// Resolve a market referenced by a payload.
    ///
    /// Lookup order is the native id, then an alternate name, then a
    /// previously reconstructed delisted market. When all miss, `reconstruct`
    /// may synthesise a market from the id; the result is cached.
    pub fn resolve<F>(&self, id: &str, reconstruct: F) -> Option<Arc<Market>>
    where
        F: FnOnce(&str) -> Option<Market>,
    {
        {
            let tables = self.tables.read();
            if let Some(market) = tables
                .by_id
                .get(id)
                .or_else(|| tables.by_alt_name.get(id))
                .or_else(|| tables.delisted.get(id))
            {
                return Some(Arc::clone(market));
            }
        }

        let market = Arc::new(reconstruct(id)?);
        warn!(market_id = %id, symbol = %market.symbol(), "Reconstructed unknown market from its id");
        self.tables
            .write()
            .delisted
            .entry(id.to_string())
            .or_insert_with(|| Arc::clone(&market));
        Some(market)
    }

    /// Unified code for an exchange currency id.
    ///
    /// Known currency ids map to their loaded code, then learned aliases
    /// apply, then the exchange's common-currency table on the upper-cased id.
    pub fn safe_currency_code(&self, id: &str) -> String {
        {
            let tables = self.tables.read();
            if let Some(currency) = tables.currencies_by_id.get(id) {
                return currency.code.clone();
            }
            if let Some(code) = tables.learned_aliases.get(id) {
                return code.clone();
            }
        }
        self.common_currency_code(&id.to_uppercase())
    }

    pub fn common_currency_code(&self, code: &str) -> String {
        self.common_currencies
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// Exchange id of a unified currency code, falling back to the code.
    pub fn currency_id(&self, code: &str) -> String {
        self.currency(code)
            .map_or_else(|| code.to_string(), |currency| currency.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::string_map;
    use crate::core::types::Asset;

    fn cache() -> MarketCache {
        let cache = MarketCache::new(string_map(&[("XBT", "BTC"), ("XDG", "DOGE")]));
        let mut market = Market::spot("XXBTZUSD", Asset::new("XXBT", "BTC"), Asset::new("ZUSD", "USD"));
        market.alt_names = vec!["XBTUSD".into(), "XBT/USD".into()];
        cache.replace_all(vec![market]);
        cache
    }

    #[test]
    fn resolves_by_id_then_alt_name() {
        let cache = cache();
        assert_eq!(cache.get("XXBTZUSD").unwrap().symbol(), "BTC/USD");
        let via_alt = cache.resolve("XBT/USD", |_| None).unwrap();
        assert_eq!(via_alt.id, "XXBTZUSD");
        assert!(cache.market("ETH/USD").is_err());
    }

    #[test]
    fn reconstructed_market_is_cached() {
        let cache = cache();
        let first = cache
            .resolve("ADAXBT", |id| {
                Some(Market::spot(id, Asset::new("ADA", "ADA"), Asset::new("XBT", "BTC")))
            })
            .unwrap();
        assert_eq!(first.symbol(), "ADA/BTC");
        // A second lookup never calls the reconstructor again.
        let second = cache.resolve("ADAXBT", |_| panic!("not cached")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn currency_code_resolution_order() {
        let cache = cache();
        assert_eq!(cache.safe_currency_code("xdg"), "DOGE");
        assert_eq!(cache.safe_currency_code("ETH"), "ETH");
        cache.learn_alias("XETH", "ETH");
        assert_eq!(cache.safe_currency_code("XETH"), "ETH");
        cache.replace_currencies(vec![Currency {
            id: "XXBT".into(),
            code: "BTC".into(),
            ..Currency::default()
        }]);
        assert_eq!(cache.safe_currency_code("XXBT"), "BTC");
        assert_eq!(cache.currency_id("BTC"), "XXBT");
    }

    #[test]
    fn clear_forgets_everything() {
        let cache = cache();
        assert!(cache.is_loaded());
        cache.clear();
        assert!(!cache.is_loaded());
        assert!(cache.get("XXBTZUSD").is_none());
    }
}
