use crate::core::config::ExchangeDescriptor;
use crate::core::errors::{ErrorKind, ExchangeError};
use crate::core::kernel::{ErrorClassifier, HttpResponse, MatchOrder};
use crate::exchanges::novadax::types::NovadaxEnvelope;
use serde_json::Value;

const EXACT: &[(&str, ErrorKind)] = &[
    ("A99999", ErrorKind::Exchange),
    ("A10001", ErrorKind::BadRequest),
    ("A10002", ErrorKind::Exchange),
    ("A10003", ErrorKind::Authentication),
    ("A10004", ErrorKind::RateLimitExceeded),
    ("A10005", ErrorKind::PermissionDenied),
    ("A10006", ErrorKind::AccountSuspended),
    ("A10007", ErrorKind::AccountNotEnabled),
    ("A10011", ErrorKind::BadSymbol),
    ("A10012", ErrorKind::BadSymbol),
    ("A10013", ErrorKind::OnMaintenance),
    ("A30001", ErrorKind::OrderNotFound),
    ("A30002", ErrorKind::InvalidOrder),
    ("A30003", ErrorKind::InvalidOrder),
    ("A30004", ErrorKind::InvalidOrder),
    ("A30005", ErrorKind::InvalidOrder),
    ("A30006", ErrorKind::InvalidOrder),
    ("A30007", ErrorKind::InsufficientFunds),
    ("A30008", ErrorKind::InvalidOrder),
    ("A30009", ErrorKind::InvalidOrder),
    ("A30010", ErrorKind::CancelPending),
    ("A30011", ErrorKind::InvalidOrder),
    ("A30012", ErrorKind::InvalidOrder),
    ("A40004", ErrorKind::InsufficientFunds),
];

pub fn classifier(descriptor: &ExchangeDescriptor) -> ErrorClassifier {
    ErrorClassifier::new(
        descriptor.id.clone(),
        descriptor.http_exceptions.clone(),
        MatchOrder::ExactFirst,
    )
    .with_exact(EXACT)
}

/// Any `code` other than `A10000` is a failure, whatever the HTTP status.
pub fn check_response(classifier: &ErrorClassifier, response: &HttpResponse) -> Result<Value, ExchangeError> {
    let json = match response.json() {
        Ok(json) => json,
        Err(e) => {
            classifier.check_status(response.status, &response.body)?;
            return Err(e);
        }
    };

    if let Ok(envelope) = serde_json::from_value::<NovadaxEnvelope>(json.clone()) {
        if !envelope.succeeded() {
            let code = envelope.code.as_deref().unwrap_or_default();
            return Err(classifier.classify(&[code], envelope.message.as_deref(), &response.body));
        }
    }

    classifier.check_status(response.status, &response.body)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::novadax::types::novadax_descriptor;

    fn check(status: u16, body: &str) -> Result<Value, ExchangeError> {
        check_response(&classifier(&novadax_descriptor()), &HttpResponse::new(status, body))
    }

    #[test]
    fn failure_codes_map_exactly() {
        assert!(matches!(
            check(200, r#"{"code":"A30007","data":null,"message":"Insufficient balance"}"#),
            Err(ExchangeError::InsufficientFunds(_))
        ));
        assert!(matches!(
            check(400, r#"{"code":"A10003","data":null,"message":"Authentication failed"}"#),
            Err(ExchangeError::Authentication(_))
        ));
        assert!(matches!(
            check(200, r#"{"code":"A30010","data":null,"message":"Order is being cancelled"}"#),
            Err(ExchangeError::CancelPending(_))
        ));
        assert!(matches!(
            check(200, r#"{"code":"A10013","data":null,"message":"Maintenance"}"#),
            Err(ExchangeError::OnMaintenance(_))
        ));
    }

    #[test]
    fn unknown_code_is_a_generic_failure() {
        match check(200, r#"{"code":"A77777","data":null,"message":"Unexpected"}"#) {
            Err(ExchangeError::Exchange(message)) => {
                assert!(message.starts_with("novadax "));
                assert!(message.contains("A77777"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn success_envelope_passes() {
        let json = check(200, r#"{"code":"A10000","data":[{"currency":"BTC"}],"message":"Success"}"#).unwrap();
        assert_eq!(json["data"][0]["currency"], "BTC");
    }

    #[test]
    fn non_json_uses_status() {
        assert!(matches!(check(429, "Too Many Requests"), Err(ExchangeError::RateLimitExceeded(_))));
        assert!(matches!(check(503, "<html>"), Err(ExchangeError::ExchangeNotAvailable(_))));
    }
}
