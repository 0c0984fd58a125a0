//! Local fallback backend — each table is one JSON array under `dt_<table>`.

use async_trait::async_trait;
use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::traits::StorageBackend;
use devtrack_core::types::{Record, Table};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::kv::{FileKvStore, KeyValueStore, MemoryKvStore};

/// Marker written once the demo data has been seeded.
pub const INITIALIZED_KEY: &str = "dt_initialized";

pub fn table_key(table: Table) -> String {
    format!("dt_{}", table.as_str())
}

pub struct LocalBackend {
    kv: Arc<dyn KeyValueStore>,
    location: Option<String>,
}

impl LocalBackend {
    pub fn new(kv: Arc<dyn KeyValueStore>, location: Option<String>) -> Self {
        Self { kv, location }
    }

    /// Backend over a JSON file on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let kv = FileKvStore::open(path)?;
        Ok(Self::new(
            Arc::new(kv),
            Some(path.to_string_lossy().into_owned()),
        ))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()), None)
    }

    fn read(&self, table: Table) -> Result<Vec<Record>> {
        let Some(text) = self.kv.get(&table_key(table))? else {
            return Ok(Vec::new());
        };
        let rows: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| DevTrackError::storage(format!("Corrupt {}: {e}", table_key(table))))?;
        rows.into_iter()
            .map(|row| match row {
                Value::Object(map) => Ok(map),
                other => Err(DevTrackError::InvalidRecord(format!(
                    "{table} row is not an object: {other}"
                ))),
            })
            .collect()
    }

    fn write(&self, table: Table, rows: &[Record]) -> Result<()> {
        self.kv.set(&table_key(table), &serde_json::to_string(rows)?)
    }
}

fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str { "local" }

    async fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        self.read(table)
    }

    async fn put(&self, table: Table, record: Record) -> Result<()> {
        let id = record_id(&record)
            .ok_or_else(|| DevTrackError::InvalidRecord(format!("{table} row without a string id")))?
            .to_string();
        let mut rows = self.read(table)?;
        match rows.iter().position(|r| record_id(r) == Some(id.as_str())) {
            Some(index) => rows[index] = record,
            None => rows.push(record),
        }
        self.write(table, &rows)
    }

    /// Replaces the whole table with `records`.
    async fn bulk_put(&self, table: Table, records: Vec<Record>) -> Result<()> {
        self.write(table, &records)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        let mut rows = self.read(table)?;
        rows.retain(|r| record_id(r) != Some(id));
        self.write(table, &rows)
    }

    async fn clear_all(&self) -> Result<()> {
        for table in Table::ALL {
            self.kv.remove(&table_key(table))?;
        }
        Ok(())
    }

    async fn is_new_database(&self) -> Result<bool> {
        Ok(self.kv.get(INITIALIZED_KEY)?.is_none())
    }

    async fn mark_initialized(&self) -> Result<()> {
        self.kv.set(INITIALIZED_KEY, "true")
    }

    async fn location(&self) -> Result<Option<String>> {
        Ok(self.location.clone())
    }
}
