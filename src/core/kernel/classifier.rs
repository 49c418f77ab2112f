use crate::core::errors::{ErrorKind, ExchangeError};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Which table wins when a failure matches both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrder {
    /// Substring rules first, then exact codes.
    BroadFirst,
    /// Exact codes first, then substring rules.
    ExactFirst,
}

/// Maps exchange error codes and messages onto [`ErrorKind`].
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    exchange: String,
    exact: HashMap<String, ErrorKind>,
    broad: Vec<(String, ErrorKind)>,
    unavailable_statuses: Vec<u16>,
    http_exceptions: BTreeMap<u16, ErrorKind>,
    order: MatchOrder,
}

impl ErrorClassifier {
    pub fn new(exchange: impl Into<String>, http_exceptions: BTreeMap<u16, ErrorKind>, order: MatchOrder) -> Self {
        Self {
            exchange: exchange.into(),
            exact: HashMap::new(),
            broad: Vec::new(),
            unavailable_statuses: Vec::new(),
            http_exceptions,
            order,
        }
    }

    pub fn with_exact(mut self, entries: &[(&str, ErrorKind)]) -> Self {
        self.exact
            .extend(entries.iter().map(|(code, kind)| ((*code).to_string(), *kind)));
        self
    }

    /// Substring rules, tried in the order given.
    pub fn with_broad(mut self, entries: &[(&str, ErrorKind)]) -> Self {
        self.broad
            .extend(entries.iter().map(|(needle, kind)| ((*needle).to_string(), *kind)));
        self
    }

    /// Statuses that mean an outage regardless of what the body says.
    pub fn with_unavailable_statuses(mut self, statuses: &[u16]) -> Self {
        self.unavailable_statuses.extend_from_slice(statuses);
        self
    }

    pub fn order(&self) -> MatchOrder {
        self.order
    }

    pub fn match_exact(&self, code: &str) -> Option<ErrorKind> {
        self.exact.get(code).copied()
    }

    pub fn match_broad(&self, message: &str) -> Option<ErrorKind> {
        self.broad
            .iter()
            .find(|(needle, _)| message.contains(needle.as_str()))
            .map(|(_, kind)| *kind)
    }

    /// Outage statuses are checked before any attempt to read the body.
    pub fn check_unavailable(&self, status: u16, body: &str) -> Result<(), ExchangeError> {
        if self.unavailable_statuses.contains(&status) {
            return Err(ExchangeError::ExchangeNotAvailable(format!(
                "{} {} {}",
                self.exchange, status, body
            )));
        }
        Ok(())
    }

    /// Look up a failure. `codes` are structured error codes in the order the
    /// exchange reported them, `message` is free text for the broad rules.
    pub fn lookup(&self, codes: &[&str], message: Option<&str>) -> Option<ErrorKind> {
        let exact = || codes.iter().find_map(|code| self.match_exact(code));
        let broad = || {
            message
                .and_then(|m| self.match_broad(m))
                .or_else(|| codes.iter().find_map(|code| self.match_broad(code)))
        };
        match self.order {
            MatchOrder::BroadFirst => broad().or_else(exact),
            MatchOrder::ExactFirst => exact().or_else(broad),
        }
    }

    /// Classify a call already known to have failed. Unrecognised failures
    /// become the generic `Exchange` error carrying the body.
    pub fn classify(&self, codes: &[&str], message: Option<&str>, body: &str) -> ExchangeError {
        let feedback = format!("{} {}", self.exchange, body);
        self.lookup(codes, message).map_or_else(
            || {
                warn!(exchange = %self.exchange, codes = ?codes, "Unmapped exchange error");
                ExchangeError::Exchange(feedback.clone())
            },
            |kind| kind.into_error(feedback.clone()),
        )
    }

    /// HTTP status table, applied after body inspection found nothing.
    pub fn check_status(&self, status: u16, body: &str) -> Result<(), ExchangeError> {
        if (200..300).contains(&status) {
            return Ok(());
        }
        let message = format!("{} {} {}", self.exchange, status, body);
        Err(self
            .http_exceptions
            .get(&status)
            .map_or_else(|| ExchangeError::Exchange(message.clone()), |kind| kind.into_error(message.clone())))
    }
}
