//! Processor error classification
//!
//! Maps the processor's opaque error codes onto a closed set of user-safe
//! messages. Anything not listed falls back to a generic message.

use serde::{Deserialize, Serialize};

/// Broad kind of a processor error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Card or issuer declined
    Decline,
    /// Request shape rejected
    Validation,
    /// Credentials or merchant setup problem
    Configuration,
    /// Network or processor availability problem, caller may retry
    Transient,
}

/// Known processor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CardExpired,
    InvalidExpiration,
    CvvFailure,
    AddressVerificationFailure,
    InvalidPostalCode,
    InsufficientFunds,
    GenericDecline,
    CardNotSupported,
    InvalidCard,
    InvalidAccount,
    PanFailure,
    TransactionLimit,
    VoiceFailure,
    AllowablePinTriesExceeded,
    InvalidPin,
    CardTokenExpired,
    CardTokenUsed,
    Unauthorized,
    AccessTokenExpired,
    LocationMismatch,
    CurrencyMismatch,
    TemporaryError,
    RateLimited,
    NetworkError,
    Unknown,
}

const FALLBACK_MESSAGE: &str =
    "Your payment could not be processed. Please try again or use a different payment method.";

impl ErrorCode {
    /// Every classified code, used to keep the table exhaustive
    pub const ALL: &'static [ErrorCode] = &[
        Self::CardExpired,
        Self::InvalidExpiration,
        Self::CvvFailure,
        Self::AddressVerificationFailure,
        Self::InvalidPostalCode,
        Self::InsufficientFunds,
        Self::GenericDecline,
        Self::CardNotSupported,
        Self::InvalidCard,
        Self::InvalidAccount,
        Self::PanFailure,
        Self::TransactionLimit,
        Self::VoiceFailure,
        Self::AllowablePinTriesExceeded,
        Self::InvalidPin,
        Self::CardTokenExpired,
        Self::CardTokenUsed,
        Self::Unauthorized,
        Self::AccessTokenExpired,
        Self::LocationMismatch,
        Self::CurrencyMismatch,
        Self::TemporaryError,
        Self::RateLimited,
        Self::NetworkError,
    ];

    /// Parse from a processor code
    pub fn from_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "CARD_EXPIRED" => Self::CardExpired,
            "INVALID_EXPIRATION" | "INVALID_EXPIRATION_DATE" | "INVALID_EXPIRATION_YEAR" => {
                Self::InvalidExpiration
            }
            "CVV_FAILURE" | "INVALID_CVV" => Self::CvvFailure,
            "ADDRESS_VERIFICATION_FAILURE" => Self::AddressVerificationFailure,
            "INVALID_POSTAL_CODE" => Self::InvalidPostalCode,
            "INSUFFICIENT_FUNDS" => Self::InsufficientFunds,
            "GENERIC_DECLINE" | "CARD_DECLINED" => Self::GenericDecline,
            "CARD_NOT_SUPPORTED" | "PAYMENT_METHOD_NOT_SUPPORTED" => Self::CardNotSupported,
            "INVALID_CARD" | "INVALID_CARD_DATA" => Self::InvalidCard,
            "INVALID_ACCOUNT" => Self::InvalidAccount,
            "PAN_FAILURE" => Self::PanFailure,
            "TRANSACTION_LIMIT" | "AMOUNT_TOO_HIGH" => Self::TransactionLimit,
            "VOICE_FAILURE" => Self::VoiceFailure,
            "ALLOWABLE_PIN_TRIES_EXCEEDED" => Self::AllowablePinTriesExceeded,
            "INVALID_PIN" => Self::InvalidPin,
            "CARD_TOKEN_EXPIRED" => Self::CardTokenExpired,
            "CARD_TOKEN_USED" => Self::CardTokenUsed,
            "UNAUTHORIZED" | "ACCESS_TOKEN_REVOKED" | "FORBIDDEN" => Self::Unauthorized,
            "ACCESS_TOKEN_EXPIRED" => Self::AccessTokenExpired,
            "LOCATION_MISMATCH" => Self::LocationMismatch,
            "CURRENCY_MISMATCH" | "UNSUPPORTED_CURRENCY" => Self::CurrencyMismatch,
            "TEMPORARY_ERROR" | "SERVICE_UNAVAILABLE" | "GATEWAY_TIMEOUT" => Self::TemporaryError,
            "RATE_LIMITED" => Self::RateLimited,
            "NETWORK_ERROR" | "BAD_RESPONSE" => Self::NetworkError,
            _ => Self::Unknown,
        }
    }

    /// User-safe message
    pub fn message(&self) -> &'static str {
        match self {
            Self::CardExpired => "Card Expired. Please contact your card issuer.",
            Self::InvalidExpiration => {
                "Invalid card expiration date. Please check the date and try again."
            }
            Self::CvvFailure => "Card verification code check failed. Please check the CVV and try again.",
            Self::AddressVerificationFailure => {
                "Card address verification failed. Please check your billing address."
            }
            Self::InvalidPostalCode => "Invalid postal code. Please check your billing postal code.",
            Self::InsufficientFunds => "Insufficient funds. Please contact your card issuer.",
            Self::GenericDecline => "Card declined. Please contact your card issuer.",
            Self::CardNotSupported => {
                "This card is not supported. Please use a different payment method."
            }
            Self::InvalidCard => "Invalid card. Please check your card details and try again.",
            Self::InvalidAccount => "Invalid account. Please contact your card issuer.",
            Self::PanFailure => "Invalid card number. Please check the number and try again.",
            Self::TransactionLimit => "Transaction limit exceeded. Please contact your card issuer.",
            Self::VoiceFailure => "Card declined. Please contact your card issuer.",
            Self::AllowablePinTriesExceeded => {
                "Too many incorrect PIN attempts. Please contact your card issuer."
            }
            Self::InvalidPin => "Incorrect PIN. Please try again.",
            Self::CardTokenExpired | Self::CardTokenUsed => {
                "Your payment session has expired. Please re-enter your card details."
            }
            Self::Unauthorized | Self::AccessTokenExpired | Self::LocationMismatch => {
                "The payment gateway is not configured correctly. Please contact the store."
            }
            Self::CurrencyMismatch => "This store cannot accept payments in the selected currency.",
            Self::TemporaryError | Self::RateLimited | Self::NetworkError => {
                "The payment service is temporarily unavailable. Please try again in a moment."
            }
            Self::Unknown => FALLBACK_MESSAGE,
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CardExpired
            | Self::InsufficientFunds
            | Self::GenericDecline
            | Self::CardNotSupported
            | Self::InvalidAccount
            | Self::TransactionLimit
            | Self::VoiceFailure
            | Self::AllowablePinTriesExceeded
            | Self::CvvFailure
            | Self::AddressVerificationFailure => ErrorKind::Decline,
            Self::Unauthorized
            | Self::AccessTokenExpired
            | Self::LocationMismatch
            | Self::CurrencyMismatch => ErrorKind::Configuration,
            Self::TemporaryError | Self::RateLimited | Self::NetworkError => ErrorKind::Transient,
            Self::InvalidExpiration
            | Self::InvalidPostalCode
            | Self::InvalidCard
            | Self::PanFailure
            | Self::InvalidPin
            | Self::CardTokenExpired
            | Self::CardTokenUsed
            | Self::Unknown => ErrorKind::Validation,
        }
    }
}

/// Result of classifying a processor error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: &'static str,
}

/// Classify a processor error code; `None` means no code was returned
pub fn classify(code: Option<&str>) -> Classification {
    let code = code.map(ErrorCode::from_code).unwrap_or(ErrorCode::Unknown);
    Classification {
        code,
        kind: code.kind(),
        message: code.message(),
    }
}
