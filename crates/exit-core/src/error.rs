//! Error types for the exit strategy simulation engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No price data is available for the requested simulation.
    #[error("price data unavailable: {message}")]
    DataUnavailable { message: String },

    /// Caller-supplied values are out of range or malformed.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The strategy definition itself is inconsistent.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Shorthand for a `DataUnavailable` error.
    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Error::DataUnavailable {
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidInput` error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Shorthand for a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
