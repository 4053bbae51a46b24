//! Error taxonomy for the registry client

use thiserror::Error;

/// Errors surfaced by every registry operation.
///
/// `RemoteCall` always preserves the underlying failure message so the UI
/// can show it verbatim; `NotFound` is kept separate so lookups that hit the
/// ledger's "absent" sentinel render as "not found" rather than a generic
/// failure banner.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("wallet is not connected")]
    NotConnected,

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("ledger call failed: {message}")]
    RemoteCall { message: String },

    #[error("operation refused: {0}")]
    Policy(String),
}

impl RegistryError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteCall {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteCall {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
