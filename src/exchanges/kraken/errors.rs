use crate::core::config::ExchangeDescriptor;
use crate::core::errors::{ErrorKind, ExchangeError};
use crate::core::kernel::{ErrorClassifier, HttpResponse, MatchOrder};
use serde_json::Value;

const EXACT: &[(&str, ErrorKind)] = &[
    ("EQuery:Invalid asset pair", ErrorKind::BadSymbol),
    ("EAPI:Invalid key", ErrorKind::Authentication),
    ("EFunding:Unknown withdraw key", ErrorKind::InvalidAddress),
    ("EFunding:Invalid amount", ErrorKind::InsufficientFunds),
    ("EService:Unavailable", ErrorKind::ExchangeNotAvailable),
    ("EDatabase:Internal error", ErrorKind::ExchangeNotAvailable),
    ("EService:Busy", ErrorKind::ExchangeNotAvailable),
    ("EQuery:Unknown asset", ErrorKind::BadSymbol),
    ("EAPI:Rate limit exceeded", ErrorKind::DDoSProtection),
    ("EOrder:Rate limit exceeded", ErrorKind::DDoSProtection),
    ("EGeneral:Internal error", ErrorKind::ExchangeNotAvailable),
    ("EGeneral:Temporary lockout", ErrorKind::DDoSProtection),
    ("EGeneral:Permission denied", ErrorKind::PermissionDenied),
    ("EGeneral:Invalid arguments:price", ErrorKind::InvalidOrder),
    ("EOrder:Unknown order", ErrorKind::OrderNotFound),
    ("EOrder:Invalid price:Invalid price argument", ErrorKind::InvalidOrder),
    ("EOrder:Order minimum not met", ErrorKind::InvalidOrder),
    ("EOrder:Insufficient funds", ErrorKind::InsufficientFunds),
    ("EGeneral:Invalid arguments", ErrorKind::BadRequest),
    ("ESession:Invalid session", ErrorKind::Authentication),
    ("EAPI:Invalid nonce", ErrorKind::InvalidNonce),
    ("EFunding:No funding method", ErrorKind::BadRequest),
    ("EFunding:Unknown asset", ErrorKind::BadSymbol),
    ("EService:Market in post_only mode", ErrorKind::OnMaintenance),
    ("EGeneral:Too many requests", ErrorKind::DDoSProtection),
    ("ETrade:User Locked", ErrorKind::AccountSuspended),
];

const BROAD: &[(&str, ErrorKind)] = &[
    (":Invalid order", ErrorKind::InvalidOrder),
    (":Invalid arguments:volume", ErrorKind::InvalidOrder),
    (":Invalid arguments:viqc", ErrorKind::InvalidOrder),
    (":Invalid nonce", ErrorKind::InvalidNonce),
    (":IInsufficient funds", ErrorKind::InsufficientFunds),
    (":Cancel pending", ErrorKind::CancelPending),
    (":Rate limit exceeded", ErrorKind::RateLimitExceeded),
];

/// Broad rules run before exact codes, so `EAPI:Rate limit exceeded` reads
/// as `RateLimitExceeded` rather than the exact table's `DDoSProtection`.
pub fn classifier(descriptor: &ExchangeDescriptor) -> ErrorClassifier {
    ErrorClassifier::new(
        descriptor.id.clone(),
        descriptor.http_exceptions.clone(),
        MatchOrder::BroadFirst,
    )
    .with_exact(EXACT)
    .with_broad(BROAD)
    .with_unavailable_statuses(&[520])
}

/// Error strings reported by a response, if any.
///
/// Kraken wraps them as `{"error": [...]}`; a few gateways answer with the
/// bare array.
fn reported_errors(json: &Value) -> Vec<&str> {
    let list = match json {
        Value::Object(map) => map.get("error").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    };
    list.map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Classify a response and hand back its JSON when it carries no error.
pub fn check_response(classifier: &ErrorClassifier, response: &HttpResponse) -> Result<Value, ExchangeError> {
    classifier.check_unavailable(response.status, &response.body)?;

    let json = match response.json() {
        Ok(json) => json,
        Err(e) => {
            classifier.check_status(response.status, &response.body)?;
            return Err(e);
        }
    };

    let errors = reported_errors(&json);
    if !errors.is_empty() {
        return Err(classifier.classify(&errors, None, &response.body));
    }

    classifier.check_status(response.status, &response.body)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::kraken::types::kraken_descriptor;

    fn check(status: u16, body: &str) -> Result<Value, ExchangeError> {
        check_response(&classifier(&kraken_descriptor()), &HttpResponse::new(status, body))
    }

    #[test]
    fn broad_rule_wins_over_exact_code() {
        let err = check(200, r#"{"error":["EAPI:Rate limit exceeded"]}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::RateLimitExceeded(_)));
    }

    #[test]
    fn exact_codes() {
        assert!(matches!(
            check(200, r#"{"error":["EOrder:Unknown order"]}"#),
            Err(ExchangeError::OrderNotFound(_))
        ));
        assert!(matches!(
            check(200, r#"{"error":["EAPI:Invalid key"]}"#),
            Err(ExchangeError::Authentication(_))
        ));
        assert!(matches!(
            check(200, r#"{"error":["EGeneral:Invalid arguments"]}"#),
            Err(ExchangeError::BadRequest(_))
        ));
    }

    #[test]
    fn invalid_nonce_is_its_own_kind() {
        let err = check(200, r#"{"error":["EAPI:Invalid nonce"]}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidNonce(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn bare_error_array_is_classified() {
        assert!(matches!(
            check(200, r#"["EQuery:Unknown asset"]"#),
            Err(ExchangeError::BadSymbol(_))
        ));
    }

    #[test]
    fn unknown_error_keeps_body() {
        match check(200, r#"{"error":["EFoo:Bar"]}"#) {
            Err(ExchangeError::Exchange(message)) => assert!(message.contains("EFoo:Bar")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn status_520_precedes_body() {
        assert!(matches!(
            check(520, r#"{"error":["EOrder:Unknown order"]}"#),
            Err(ExchangeError::ExchangeNotAvailable(_))
        ));
    }

    #[test]
    fn clean_envelope_passes() {
        let json = check(200, r#"{"error":[],"result":{"unixtime":1}}"#).unwrap();
        assert_eq!(json["result"]["unixtime"], 1);
    }

    #[test]
    fn html_error_page_falls_back_to_status() {
        assert!(matches!(check(503, "<html>busy</html>"), Err(ExchangeError::ExchangeNotAvailable(_))));
        assert!(matches!(check(200, "<html>"), Err(ExchangeError::Deserialization(_))));
    }
}
