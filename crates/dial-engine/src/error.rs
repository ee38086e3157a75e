//! Error types for the dialing engine

use thiserror::Error;

use autodial_telephony_core::TelephonyError;

#[derive(Debug, Error)]
pub enum DialerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Telephony error: {0}")]
    Telephony(#[from] TelephonyError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Engine is shutting down")]
    Shutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DialerError>;
