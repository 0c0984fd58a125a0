//! Storage backend trait — uniform CRUD over the four tables.

use async_trait::async_trait;

use crate::error::{DevTrackError, Result};
use crate::types::{Record, Table};

/// Persistence strategy behind the data access service.
///
/// Rows cross this boundary as plain JSON objects keyed by the camelCase
/// field names. Every write is keyed by the record's `id`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend name for logs ("native", "local").
    fn name(&self) -> &str;

    /// All rows of `table`, in storage order.
    async fn get_all(&self, table: Table) -> Result<Vec<Record>>;

    /// Insert or replace one row by id.
    async fn put(&self, table: Table, record: Record) -> Result<()>;

    /// Write many rows in one operation.
    async fn bulk_put(&self, table: Table, records: Vec<Record>) -> Result<()>;

    /// Remove a row. Missing ids are not an error.
    async fn delete(&self, table: Table, id: &str) -> Result<()>;

    /// Empty every table.
    async fn clear_all(&self) -> Result<()>;

    /// True when the store has never been seeded.
    async fn is_new_database(&self) -> Result<bool>;

    /// Record that the store holds initial data.
    async fn mark_initialized(&self) -> Result<()>;

    /// Human-readable location of the data, if any.
    async fn location(&self) -> Result<Option<String>>;

    /// Move the database file. Takes effect on the next start.
    async fn set_db_path(&self, _new_path: &str) -> Result<String> {
        Err(DevTrackError::storage(format!(
            "{} backend has no relocatable database",
            self.name()
        )))
    }

    /// Whether `bulk_put` merges rows atomically. When false, `bulk_put`
    /// replaces the whole table and callers wanting a merge must `put`.
    fn atomic_bulk(&self) -> bool {
        false
    }
}
