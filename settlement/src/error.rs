//! Error types for the settlement layer

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] wallet_core::Error),

    /// Party failed KYC validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Gateway responded with a non-2xx status
    #[error("Gateway rejected request ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Provider error message
        message: String,
    },

    /// Request never reached the gateway or no response came back
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// Request signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
