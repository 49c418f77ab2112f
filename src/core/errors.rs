use std::fmt;
use thiserror::Error;

/// Unified error taxonomy surfaced by every adapter.
///
/// Classified variants carry the raw exchange body (or message) so the
/// source payload is never lost.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Bad symbol: {0}")]
    BadSymbol(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(String),

    #[error("Cancel pending: {0}")]
    CancelPending(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("DDoS protection: {0}")]
    DDoSProtection(String),

    #[error("Exchange not available: {0}")]
    ExchangeNotAvailable(String),

    #[error("On maintenance: {0}")]
    OnMaintenance(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout: {0}")]
    RequestTimeout(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Account suspended: {0}")]
    AccountSuspended(String),

    #[error("Account not enabled: {0}")]
    AccountNotEnabled(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Config error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}

/// Fieldless mirror of the classified variants, used as the value type of
/// error-mapping tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    InvalidNonce,
    InvalidOrder,
    OrderNotFound,
    InsufficientFunds,
    BadSymbol,
    BadRequest,
    InvalidAddress,
    DuplicateOrderId,
    CancelPending,
    RateLimitExceeded,
    DDoSProtection,
    ExchangeNotAvailable,
    OnMaintenance,
    NetworkError,
    RequestTimeout,
    PermissionDenied,
    AccountSuspended,
    AccountNotEnabled,
    NotSupported,
    Exchange,
}

impl ErrorKind {
    /// Build the matching error variant carrying `message`.
    pub fn into_error(self, message: impl Into<String>) -> ExchangeError {
        let message = message.into();
        match self {
            Self::Authentication => ExchangeError::Authentication(message),
            Self::InvalidNonce => ExchangeError::InvalidNonce(message),
            Self::InvalidOrder => ExchangeError::InvalidOrder(message),
            Self::OrderNotFound => ExchangeError::OrderNotFound(message),
            Self::InsufficientFunds => ExchangeError::InsufficientFunds(message),
            Self::BadSymbol => ExchangeError::BadSymbol(message),
            Self::BadRequest => ExchangeError::BadRequest(message),
            Self::InvalidAddress => ExchangeError::InvalidAddress(message),
            Self::DuplicateOrderId => ExchangeError::DuplicateOrderId(message),
            Self::CancelPending => ExchangeError::CancelPending(message),
            Self::RateLimitExceeded => ExchangeError::RateLimitExceeded(message),
            Self::DDoSProtection => ExchangeError::DDoSProtection(message),
            Self::ExchangeNotAvailable => ExchangeError::ExchangeNotAvailable(message),
            Self::OnMaintenance => ExchangeError::OnMaintenance(message),
            Self::NetworkError => ExchangeError::NetworkError(message),
            Self::RequestTimeout => ExchangeError::RequestTimeout(message),
            Self::PermissionDenied => ExchangeError::PermissionDenied(message),
            Self::AccountSuspended => ExchangeError::AccountSuspended(message),
            Self::AccountNotEnabled => ExchangeError::AccountNotEnabled(message),
            Self::NotSupported => ExchangeError::NotSupported(message),
            Self::Exchange => ExchangeError::Exchange(message),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ExchangeError {
    /// The taxonomy kind of this error. Local errors (configuration,
    /// serialization) report as the generic `Exchange` kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::InvalidNonce(_) => ErrorKind::InvalidNonce,
            Self::InvalidOrder(_) => ErrorKind::InvalidOrder,
            Self::OrderNotFound(_) => ErrorKind::OrderNotFound,
            Self::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            Self::BadSymbol(_) => ErrorKind::BadSymbol,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::DuplicateOrderId(_) => ErrorKind::DuplicateOrderId,
            Self::CancelPending(_) => ErrorKind::CancelPending,
            Self::RateLimitExceeded(_) => ErrorKind::RateLimitExceeded,
            Self::DDoSProtection(_) => ErrorKind::DDoSProtection,
            Self::ExchangeNotAvailable(_) => ErrorKind::ExchangeNotAvailable,
            Self::OnMaintenance(_) => ErrorKind::OnMaintenance,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::RequestTimeout(_) => ErrorKind::RequestTimeout,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::AccountSuspended(_) => ErrorKind::AccountSuspended,
            Self::AccountNotEnabled(_) => ErrorKind::AccountNotEnabled,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Exchange(_)
            | Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::Config(_) => ErrorKind::Exchange,
        }
    }

    /// Whether a higher layer may retry the call with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded(_)
                | Self::DDoSProtection(_)
                | Self::ExchangeNotAvailable(_)
                | Self::OnMaintenance(_)
                | Self::NetworkError(_)
                | Self::RequestTimeout(_)
                | Self::InvalidNonce(_)
        )
    }

    /// Invalid nonces are reported separately but belong to the
    /// authentication family.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::InvalidNonce(_))
    }
}

/// Extension trait for logging failed adapter operations with context.
pub trait ResultExt<T> {
    fn with_exchange_context(self, exchange: &str, operation: &str) -> Result<T, ExchangeError>;
}

impl<T> ResultExt<T> for Result<T, ExchangeError> {
    fn with_exchange_context(self, exchange: &str, operation: &str) -> Self {
        self.map_err(|e| {
            tracing::error!(
                exchange = %exchange,
                operation = %operation,
                kind = %e.kind(),
                error = %e,
                "Exchange operation failed"
            );
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_into_error() {
        let err = ErrorKind::OrderNotFound.into_error("EOrder:Unknown order");
        assert_eq!(err.kind(), ErrorKind::OrderNotFound);
        assert!(err.to_string().contains("EOrder:Unknown order"));
    }

    #[test]
    fn retryable_split() {
        assert!(ExchangeError::RateLimitExceeded(String::new()).is_retryable());
        assert!(ExchangeError::ExchangeNotAvailable(String::new()).is_retryable());
        assert!(ExchangeError::RequestTimeout(String::new()).is_retryable());
        assert!(!ExchangeError::BadRequest(String::new()).is_retryable());
        assert!(!ExchangeError::InsufficientFunds(String::new()).is_retryable());
        assert!(!ExchangeError::NotSupported(String::new()).is_retryable());
    }

    #[test]
    fn invalid_nonce_is_authentication_class() {
        let err = ExchangeError::InvalidNonce("EAPI:Invalid nonce".into());
        assert!(err.is_authentication());
        assert!(!ExchangeError::BadSymbol(String::new()).is_authentication());
    }
}
