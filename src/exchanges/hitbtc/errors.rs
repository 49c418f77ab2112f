use crate::core::config::ExchangeDescriptor;
use crate::core::errors::{ErrorKind, ExchangeError};
use crate::core::kernel::{ErrorClassifier, HttpResponse, MatchOrder};
use crate::exchanges::hitbtc::types::HitbtcErrorEnvelope;
use serde_json::Value;

const EXACT: &[(&str, ErrorKind)] = &[
    ("429", ErrorKind::RateLimitExceeded),
    ("500", ErrorKind::Exchange),
    ("503", ErrorKind::ExchangeNotAvailable),
    ("504", ErrorKind::ExchangeNotAvailable),
    ("600", ErrorKind::PermissionDenied),
    ("800", ErrorKind::Exchange),
    ("1002", ErrorKind::Authentication),
    ("1003", ErrorKind::PermissionDenied),
    ("1004", ErrorKind::Authentication),
    ("1005", ErrorKind::Authentication),
    ("2001", ErrorKind::BadSymbol),
    ("2002", ErrorKind::BadRequest),
    ("2003", ErrorKind::BadRequest),
    ("2010", ErrorKind::BadRequest),
    ("2011", ErrorKind::BadRequest),
    ("2012", ErrorKind::BadRequest),
    ("2020", ErrorKind::BadRequest),
    ("2022", ErrorKind::BadRequest),
    ("2024", ErrorKind::InvalidOrder),
    ("10001", ErrorKind::BadRequest),
    ("10021", ErrorKind::AccountSuspended),
    ("10022", ErrorKind::BadRequest),
    ("20001", ErrorKind::InsufficientFunds),
    ("20002", ErrorKind::OrderNotFound),
    ("20003", ErrorKind::Exchange),
    ("20004", ErrorKind::Exchange),
    ("20005", ErrorKind::Exchange),
    ("20006", ErrorKind::Exchange),
    ("20007", ErrorKind::Exchange),
    ("20008", ErrorKind::InvalidOrder),
    ("20009", ErrorKind::InvalidOrder),
    ("20010", ErrorKind::OnMaintenance),
    ("20011", ErrorKind::Exchange),
    ("20012", ErrorKind::Exchange),
    ("20014", ErrorKind::Exchange),
    ("20016", ErrorKind::Exchange),
    ("20018", ErrorKind::Exchange),
    ("20031", ErrorKind::Exchange),
    ("20032", ErrorKind::Exchange),
    ("20033", ErrorKind::Exchange),
    ("20034", ErrorKind::Exchange),
    ("20040", ErrorKind::Exchange),
    ("20041", ErrorKind::Exchange),
    ("20042", ErrorKind::Exchange),
    ("20043", ErrorKind::Exchange),
    ("20044", ErrorKind::PermissionDenied),
    ("20045", ErrorKind::InvalidOrder),
    ("20047", ErrorKind::InvalidOrder),
    ("20048", ErrorKind::InvalidOrder),
    ("20049", ErrorKind::InvalidOrder),
    ("20080", ErrorKind::Exchange),
    ("21001", ErrorKind::Exchange),
    ("21003", ErrorKind::AccountSuspended),
    ("21004", ErrorKind::AccountSuspended),
    ("22004", ErrorKind::Exchange),
    ("22008", ErrorKind::Exchange),
];

/// Message fragments for codes the exchange reuses across failures.
const BROAD: &[(&str, ErrorKind)] = &[
    ("Insufficient funds", ErrorKind::InsufficientFunds),
    ("Order not found", ErrorKind::OrderNotFound),
    ("Symbol not found", ErrorKind::BadSymbol),
];

pub fn classifier(descriptor: &ExchangeDescriptor) -> ErrorClassifier {
    ErrorClassifier::new(
        descriptor.id.clone(),
        descriptor.http_exceptions.clone(),
        MatchOrder::ExactFirst,
    )
    .with_exact(EXACT)
    .with_broad(BROAD)
}

/// Failures arrive as `{"error": {...}}` with a non-2xx status. Anything
/// without an error code falls through to the status table.
pub fn check_response(classifier: &ErrorClassifier, response: &HttpResponse) -> Result<Value, ExchangeError> {
    let json = match response.json() {
        Ok(json) => json,
        Err(e) => {
            classifier.check_status(response.status, &response.body)?;
            return Err(e);
        }
    };

    if let Ok(envelope) = serde_json::from_value::<HitbtcErrorEnvelope>(json.clone()) {
        if let Some(code) = envelope.error.code() {
            return Err(classifier.classify(&[code.as_str()], envelope.error.text(), &response.body));
        }
    }

    classifier.check_status(response.status, &response.body)?;
    Ok(json)
}
