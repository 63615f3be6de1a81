//! Error types for the history store
//!
//! Every variant carries the human readable description reported by the
//! cluster driver (or by the config loader), so hosts can log it verbatim.

use thiserror::Error;

/// Result type alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// History store error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Config file missing, unparsable, or without usable `remotes`
    #[error("Config error: {0}")]
    Config(String),

    /// The session could not connect to the cluster
    #[error("Connection error: {0}")]
    Connection(String),

    /// The cluster refused to prepare a statement
    #[error("Preparation error: {0}")]
    Preparation(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Delete error: {0}")]
    Delete(String),

    #[error("Read error: {0}")]
    Read(String),
}

/// Failure reported by a cluster driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Driver supplied description
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for DriverError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for DriverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
