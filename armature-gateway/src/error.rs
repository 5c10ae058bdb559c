//! Error types for checkout and refund reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Gateway error types
///
/// Failure variants raised after talking to the processor carry a support
/// reference code and a user-safe message. The raw processor errors are kept
/// on the variant for logging but never rendered by `Display`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or invalid credentials / merchant settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cart currency differs from the merchant settlement currency
    #[error("Currency {currency} is not supported, the merchant settles in {merchant}")]
    UnsupportedCurrency { currency: String, merchant: String },

    /// Amount cannot be represented in minor units
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Cart violates a structural invariant
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// Local order does not exist
    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    /// Local order is not in a state that allows the operation
    #[error("Order {id} cannot be charged in state {state}")]
    InvalidOrderState { id: u64, state: String },

    /// Local customer record could not be created
    #[error("Unable to create customer (ref: {reference})")]
    CustomerCreationFailed {
        reference: String,
        #[source]
        source: StoreError,
    },

    /// Processor rejected the customer creation
    #[error("{message} (ref: {reference})")]
    RemoteCustomerCreationFailed {
        reference: String,
        message: String,
        errors: ProcessorErrors,
    },

    /// Processor rejected the order creation
    #[error("{message} (ref: {reference})")]
    OrderCreationFailed {
        reference: String,
        message: String,
        errors: ProcessorErrors,
    },

    /// Charge failed; the remote order has been canceled
    #[error("{message} (ref: {reference})")]
    PaymentFailed {
        reference: String,
        message: String,
        errors: ProcessorErrors,
    },

    /// Refund submission failed
    #[error("{message} (ref: {reference})")]
    RefundFailed {
        reference: String,
        message: String,
        errors: ProcessorErrors,
    },

    /// Remote side effect succeeded but the local write did not
    #[error("Local record out of sync with processor: {context} (ref: {reference})")]
    Persistence {
        reference: String,
        context: String,
        #[source]
        source: StoreError,
    },

    /// Local store failure before any remote side effect
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// Support reference code, if the error carries one
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::CustomerCreationFailed { reference, .. }
            | Self::RemoteCustomerCreationFailed { reference, .. }
            | Self::OrderCreationFailed { reference, .. }
            | Self::PaymentFailed { reference, .. }
            | Self::RefundFailed { reference, .. }
            | Self::Persistence { reference, .. } => Some(reference.as_str()),
            _ => None,
        }
    }

    /// Message that is safe to show to a customer or operator
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteCustomerCreationFailed { message, .. }
            | Self::OrderCreationFailed { message, .. }
            | Self::PaymentFailed { message, .. }
            | Self::RefundFailed { message, .. } => message.clone(),
            Self::Config(_) => {
                "The payment gateway is not configured correctly. Please contact the store."
                    .to_string()
            }
            Self::UnsupportedCurrency { .. } => {
                "This store cannot accept payments in the selected currency.".to_string()
            }
            _ => "Your payment could not be processed. Please try again.".to_string(),
        }
    }

    /// Processor errors attached to the failure, if any
    pub fn processor_errors(&self) -> Option<&ProcessorErrors> {
        match self {
            Self::RemoteCustomerCreationFailed { errors, .. }
            | Self::OrderCreationFailed { errors, .. }
            | Self::PaymentFailed { errors, .. }
            | Self::RefundFailed { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Generate a support reference code (`GW-` followed by 8 hex digits)
pub fn reference_code() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("GW-{}", id[..8].to_uppercase())
}

/// A single structured processor error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorError {
    /// Error category (e.g. `PAYMENT_METHOD_ERROR`)
    #[serde(default)]
    pub category: String,
    /// Machine-readable code, drives the classifier
    pub code: String,
    /// Human-readable detail, log only
    #[serde(default)]
    pub detail: Option<String>,
    /// Offending request field
    #[serde(default)]
    pub field: Option<String>,
}

impl ProcessorError {
    /// Create an error with a code and detail
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            category: String::new(),
            code: code.into(),
            detail: Some(detail.into()),
            field: None,
        }
    }
}

/// Errors returned by one processor call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorErrors(pub Vec<ProcessorError>);

impl ProcessorErrors {
    /// Wrap a single error
    pub fn single(error: ProcessorError) -> Self {
        Self(vec![error])
    }

    /// Transport-level failure
    pub fn network(detail: impl fmt::Display) -> Self {
        Self::single(ProcessorError {
            category: "API_ERROR".to_string(),
            ..ProcessorError::new("NETWORK_ERROR", detail.to_string())
        })
    }

    /// Response body could not be decoded
    pub fn bad_response(detail: impl fmt::Display) -> Self {
        Self::single(ProcessorError {
            category: "API_ERROR".to_string(),
            ..ProcessorError::new("BAD_RESPONSE", detail.to_string())
        })
    }

    /// Code of the first error, used for classification
    pub fn first_code(&self) -> Option<&str> {
        self.0.first().map(|e| e.code.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProcessorErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| match &e.detail {
                Some(detail) => format!("{}: {}", e.code, detail),
                None => e.code.clone(),
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl From<reqwest::Error> for ProcessorErrors {
    fn from(err: reqwest::Error) -> Self {
        ProcessorErrors::network(err)
    }
}

impl From<url::ParseError> for ProcessorErrors {
    fn from(err: url::ParseError) -> Self {
        ProcessorErrors::single(ProcessorError::new("BAD_REQUEST", err.to_string()))
    }
}

impl From<serde_json::Error> for ProcessorErrors {
    fn from(err: serde_json::Error) -> Self {
        ProcessorErrors::bad_response(err)
    }
}

/// Result type for processor API calls
pub type ApiResult<T> = Result<T, ProcessorErrors>;

/// Local store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_code_format() {
        let code = reference_code();
        assert!(code.starts_with("GW-"));
        assert_eq!(code.len(), 11);
        assert!(code[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_display_hides_processor_detail() {
        let err = GatewayError::PaymentFailed {
            reference: "GW-0000ABCD".to_string(),
            message: "Card Expired. Please contact your card issuer.".to_string(),
            errors: ProcessorErrors::single(ProcessorError::new(
                "CARD_EXPIRED",
                "internal issuer response 54",
            )),
        };

        let display = err.to_string();
        assert!(display.contains("Card Expired"));
        assert!(display.contains("GW-0000ABCD"));
        assert!(!display.contains("issuer response 54"));
        assert_eq!(err.reference(), Some("GW-0000ABCD"));
        assert_eq!(
            err.processor_errors().and_then(|e| e.first_code()),
            Some("CARD_EXPIRED")
        );
    }

    #[test]
    fn test_processor_errors_parse() {
        let json = r#"[{"category":"PAYMENT_METHOD_ERROR","code":"CVV_FAILURE","detail":"bad cvv","field":"cvv"}]"#;
        let errors: ProcessorErrors = serde_json::from_str(json).unwrap();
        assert_eq!(errors.first_code(), Some("CVV_FAILURE"));
        assert_eq!(errors.0[0].field.as_deref(), Some("cvv"));
        assert_eq!(errors.to_string(), "CVV_FAILURE: bad cvv");
    }

    #[test]
    fn test_user_message_for_config_error() {
        let err = GatewayError::Config("missing access token".to_string());
        assert!(!err.user_message().contains("access token"));
        assert!(err.reference().is_none());
    }
}
