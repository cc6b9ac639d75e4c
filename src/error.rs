//! AS2 engine error types.
//!
//! # Error Classification
//!
//! | Class        | Variants                              | Retried | Surfaced as            |
//! |--------------|---------------------------------------|---------|------------------------|
//! | Validation   | `Validation`                          | no      | `Err` from `send`      |
//! | Transport    | `Transport`, `Network`                | yes     | log on exhaustion      |
//! | Disposition  | `Disposition`                         | no      | `Err` (sync) / log     |
//! | Request      | `InvalidRequest`                      | no      | `Err` from `send`      |
//! | Correlation  | `PendingNotFound`                     | no      | HTTP 404 (receiver)    |
//! | Integrity    | `MicMismatch`                         | no      | log; 404 (receiver)    |
//!
//! Everything else (`Mdn`, `Crypto`, `Certificate`, ...) is a collaborator or
//! environment failure and propagates unchanged.

use thiserror::Error;

use crate::disposition::Disposition;

/// AS2 engine errors.
#[derive(Error, Debug)]
pub enum As2Error {
    /// A field required for sending is missing or empty.
    #[error("Missing required field: {field}")]
    Validation {
        /// Name of the first missing field.
        field: String,
    },

    /// The partner answered with a non-success HTTP status.
    #[error("HTTP error from {url}: {status} {reason}")]
    Transport {
        /// Partner URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Reason phrase.
        reason: String,
    },

    /// Connect, timeout, or stream failure before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The receipt reports a failed disposition.
    #[error("Disposition error: {disposition}")]
    Disposition {
        /// Parsed disposition.
        disposition: Disposition,
        /// Human-readable MDN text, when available.
        text: Option<String>,
    },

    /// No pending record exists for the receipt's original message ID.
    #[error("No pending record for message {0}")]
    PendingNotFound(String),

    /// The receipt MIC does not match the recorded MIC.
    #[error("MIC mismatch: expected {expected}, received {received}")]
    MicMismatch {
        /// MIC recorded at send time.
        expected: String,
        /// MIC claimed by the receipt.
        received: String,
    },

    /// The outbound request could not be built from the message.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The MDN could not be read or parsed.
    #[error("MDN error: {0}")]
    Mdn(String),

    /// Signing, encryption, verification, or digest failure.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Certificate or key lookup failed.
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// Partnership could not be resolved.
    #[error("Partnership error: {0}")]
    Partnership(String),

    /// Pending-record or archive storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Message ID unusable as a storage key.
    #[error("Invalid message ID: {0:?}")]
    InvalidMessageId(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Receiver listener failure.
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AS2 operations
pub type Result<T> = std::result::Result<T, As2Error>;

impl As2Error {
    /// Shorthand for a missing required field.
    pub fn missing(field: impl Into<String>) -> Self {
        As2Error::Validation {
            field: field.into(),
        }
    }

    /// Whether the resend controller may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, As2Error::Transport { .. } | As2Error::Network(_))
    }
}

impl From<reqwest::Error> for As2Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            As2Error::InvalidRequest(err.to_string())
        } else {
            As2Error::Network(err.to_string())
        }
    }
}

impl From<toml::de::Error> for As2Error {
    fn from(err: toml::de::Error) -> Self {
        As2Error::Config(err.to_string())
    }
}

impl From<base64::DecodeError> for As2Error {
    fn from(err: base64::DecodeError) -> Self {
        As2Error::Mdn(format!("Base64 decode error: {err}"))
    }
}
