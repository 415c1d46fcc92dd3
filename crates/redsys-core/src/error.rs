//! Error types for the Redsys protocol core.
//!
//! Messages never carry key material, raw or derived.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration missing: {field}")]
    ConfigMissing { field: &'static str },

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid merchant key: {message}")]
    InvalidKey { message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Unsupported signature version: {version}")]
    UnsupportedSignatureVersion { version: String },

    #[error("Signature mismatch for order {order}")]
    SignatureMismatch { order: String },

    #[error("Payment for order {order} declined with response code {response_code}")]
    DeclinedResponse { order: String, response_code: u32 },

    #[error("Invalid payment: {message}")]
    InvalidPayment { message: String },

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while reading a gateway-supplied parameter blob.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid parameter data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

impl Error {
    /// True for the variants produced by a well-formed callback that failed
    /// verification or was declined, as opposed to local misconfiguration.
    pub fn is_callback_rejection(&self) -> bool {
        matches!(
            self,
            Error::Decode(_)
                | Error::UnsupportedSignatureVersion { .. }
                | Error::SignatureMismatch { .. }
                | Error::DeclinedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
