//! Error types for control plane operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Control plane request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Control plane rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TelephonyError {
    /// Whether this error means the resource was already in the requested
    /// state (session created, dispatch rule present). Callers treat these
    /// as success.
    pub fn is_already_exists(&self) -> bool {
        match self {
            TelephonyError::AlreadyExists(_) => true,
            TelephonyError::Api { message, .. } => {
                let lower = message.to_lowercase();
                lower.contains("already exists") || lower.contains("duplicate")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TelephonyError>;
