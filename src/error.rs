use std::time::Duration;
use thiserror::Error;

/// Failure of a single request/reply round trip
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Remote rejected {method}: {status} {message}")]
    Rejected {
        method: String,
        status: u16,
        message: String,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Could not decode reply: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
