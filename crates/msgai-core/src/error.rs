//! Error types for msgai

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("User {0} not found.")]
    UnknownUser(String),

    #[error("{sender} balance insufficient for {currency}.")]
    InsufficientBalance { sender: String, currency: String },

    /// Negative, NaN or infinite amount. A negative transfer is refused
    /// rather than pulling funds back from the recipient.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("store error: {key} - {message}")]
    StoreError { key: String, message: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unknown_user(name: impl Into<String>) -> Self {
        Self::UnknownUser(name.into())
    }

    pub fn insufficient_balance(sender: impl Into<String>, currency: impl Into<String>) -> Self {
        Self::InsufficientBalance {
            sender: sender.into(),
            currency: currency.into(),
        }
    }

    pub fn store_error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreError {
            key: key.into(),
            message: message.into(),
        }
    }
}
