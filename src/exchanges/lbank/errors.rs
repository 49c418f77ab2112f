use crate::core::config::ExchangeDescriptor;
use crate::core::errors::{ErrorKind, ExchangeError};
use crate::core::kernel::signer::param_to_string;
use crate::core::kernel::{ErrorClassifier, HttpResponse, MatchOrder};
use crate::exchanges::lbank::types::LbankEnvelope;
use serde_json::Value;

/// `error_code`, its documented description and the error it maps to.
const ERROR_CODES: &[(&str, &str, ErrorKind)] = &[
    ("10000", "Internal error", ErrorKind::Exchange),
    ("10001", "The required parameters can not be empty", ErrorKind::BadRequest),
    ("10002", "Validation failed", ErrorKind::Authentication),
    ("10003", "Invalid parameter", ErrorKind::BadRequest),
    ("10004", "Request too frequent", ErrorKind::RateLimitExceeded),
    ("10005", "Secret key does not exist", ErrorKind::Authentication),
    ("10006", "User does not exist", ErrorKind::Authentication),
    ("10007", "Invalid signature", ErrorKind::Authentication),
    ("10008", "Invalid Trading Pair", ErrorKind::BadSymbol),
    ("10009", "Price and/or Amount are required for limit order", ErrorKind::InvalidOrder),
    ("10010", "Price and/or Amount must be less than minimum requirement", ErrorKind::InvalidOrder),
    ("10013", "The amount is too small", ErrorKind::InvalidOrder),
    ("10014", "Insufficient amount of money in the account", ErrorKind::InsufficientFunds),
    ("10015", "Invalid order type", ErrorKind::InvalidOrder),
    ("10016", "Insufficient account balance", ErrorKind::InsufficientFunds),
    ("10017", "Server Error", ErrorKind::Exchange),
    ("10018", "Page size should be between 1 and 50", ErrorKind::BadRequest),
    ("10019", "Cancel NO more than 3 orders in one request", ErrorKind::BadRequest),
    ("10020", "Volume < 0.001", ErrorKind::BadRequest),
    ("10021", "Price < 0.01", ErrorKind::InvalidOrder),
    ("10022", "Invalid authorization", ErrorKind::PermissionDenied),
    ("10023", "Market Order is not supported yet", ErrorKind::InvalidOrder),
    ("10024", "User cannot trade on this pair", ErrorKind::PermissionDenied),
    ("10025", "Order has been filled", ErrorKind::InvalidOrder),
    ("10026", "Order has been cancelld", ErrorKind::InvalidOrder),
    ("10027", "Order is cancelling", ErrorKind::InvalidOrder),
    ("10028", "Wrong query time", ErrorKind::BadRequest),
    ("10029", "from is not in the query time", ErrorKind::BadRequest),
    ("10030", "from do not match the transaction type of inqury", ErrorKind::BadRequest),
    ("10031", "echostr length must be valid and length must be from 30 to 40", ErrorKind::InvalidNonce),
    ("10033", "Failed to create order", ErrorKind::Exchange),
    ("10036", "customID duplicated", ErrorKind::DuplicateOrderId),
    ("10100", "Has no privilege to withdraw", ErrorKind::PermissionDenied),
    ("10101", "Invalid fee rate to withdraw", ErrorKind::BadRequest),
    ("10102", "Too little to withdraw", ErrorKind::InsufficientFunds),
    ("10103", "Exceed daily limitation of withdraw", ErrorKind::Exchange),
    ("10104", "Cancel was rejected", ErrorKind::Exchange),
    ("10105", "Request has been cancelled", ErrorKind::Exchange),
    ("10106", "None trade time", ErrorKind::BadRequest),
    ("10107", "Start price exception", ErrorKind::BadRequest),
    ("10108", "can not create order", ErrorKind::Exchange),
    ("10109", "wallet address is not mapping", ErrorKind::InvalidAddress),
    ("10110", "transfer fee is not mapping", ErrorKind::Exchange),
    ("10111", "mount > 0", ErrorKind::BadRequest),
    ("10112", "fee is too lower", ErrorKind::BadRequest),
    ("10113", "transfer fee is 0", ErrorKind::BadRequest),
    ("10600", "intercepted by replay attacks filter, check timestamp", ErrorKind::BadRequest),
    ("10601", "Interface closed unavailable", ErrorKind::Exchange),
    ("10701", "invalid asset code", ErrorKind::BadSymbol),
    ("10702", "not allowed deposit", ErrorKind::PermissionDenied),
];

pub fn classifier(descriptor: &ExchangeDescriptor) -> ErrorClassifier {
    let exact: Vec<(&str, ErrorKind)> = ERROR_CODES.iter().map(|(code, _, kind)| (*code, *kind)).collect();
    ErrorClassifier::new(
        descriptor.id.clone(),
        descriptor.http_exceptions.clone(),
        MatchOrder::ExactFirst,
    )
    .with_exact(&exact)
}

/// Documented description of an error code.
pub fn describe(code: &str) -> Option<&'static str> {
    ERROR_CODES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, message, _)| *message)
}

/// Classify a response and hand back its JSON when `result` reports success.
pub fn check_response(classifier: &ErrorClassifier, response: &HttpResponse) -> Result<Value, ExchangeError> {
    let json = match response.json() {
        Ok(json) => json,
        Err(e) => {
            classifier.check_status(response.status, &response.body)?;
            return Err(e);
        }
    };

    if let Ok(envelope) = serde_json::from_value::<LbankEnvelope>(json.clone()) {
        if !envelope.succeeded() {
            let code = param_to_string(&envelope.error_code);
            let text = match describe(&code) {
                Some(description) => format!("{} {}", description, response.body),
                None => response.body.clone(),
            };
            return Err(classifier.classify(&[code.as_str()], None, &text));
        }
    }

    classifier.check_status(response.status, &response.body)?;
    Ok(json)
}
