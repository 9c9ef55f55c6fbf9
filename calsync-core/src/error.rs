//! Error types for calsync.

use thiserror::Error;

/// Errors that abort a sync cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Feed parse error: {0}")]
    Feed(String),

    #[error("Update of event {event_id} failed: {message}")]
    Update { event_id: String, message: String },
}

impl SyncError {
    pub fn update(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Update {
            event_id: event_id.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for calsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
