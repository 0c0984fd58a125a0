//! DevTrack error types.

use crate::types::Table;

/// Errors surfaced by the storage layer, the bridge and the state store.
#[derive(Debug, thiserror::Error)]
pub enum DevTrackError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Cannot delete {table} {id}: {reason}")]
    DeleteBlocked {
        table: Table,
        id: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DevTrackError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn bridge(msg: impl Into<String>) -> Self {
        Self::Bridge(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for referential-integrity refusals raised before any storage call.
    pub fn is_delete_blocked(&self) -> bool {
        matches!(self, Self::DeleteBlocked { .. })
    }
}

pub type Result<T> = std::result::Result<T, DevTrackError>;
