//! Native backend — forwards every operation to the storage host.

use async_trait::async_trait;
use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::traits::StorageBackend;
use devtrack_core::types::{Record, Table};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::bridge::Bridge;

pub struct NativeBackend {
    bridge: Arc<dyn Bridge>,
}

impl NativeBackend {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl StorageBackend for NativeBackend {
    fn name(&self) -> &str { "native" }

    async fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        match self.bridge.invoke("db_get_all", json!({ "table": table })).await? {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(map) => Ok(map),
                    other => Err(DevTrackError::InvalidRecord(format!(
                        "{table} row is not an object: {other}"
                    ))),
                })
                .collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(DevTrackError::bridge(format!(
                "db_get_all returned {other} for {table}"
            ))),
        }
    }

    async fn put(&self, table: Table, record: Record) -> Result<()> {
        self.bridge
            .invoke("db_put", json!({ "table": table, "item": record }))
            .await?;
        Ok(())
    }

    async fn bulk_put(&self, table: Table, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.bridge
            .invoke("db_bulk_put", json!({ "table": table, "items": records }))
            .await?;
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        self.bridge
            .invoke("db_delete", json!({ "table": table, "id": id }))
            .await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.bridge.invoke("db_clear_all", json!({})).await?;
        Ok(())
    }

    async fn is_new_database(&self) -> Result<bool> {
        Ok(self
            .bridge
            .invoke("is_new_database", json!({}))
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn mark_initialized(&self) -> Result<()> {
        self.bridge.invoke("mark_initialized", json!({})).await?;
        Ok(())
    }

    async fn location(&self) -> Result<Option<String>> {
        let path = self.bridge.invoke("get_db_path", json!({})).await?;
        Ok(path.as_str().map(str::to_string))
    }

    async fn set_db_path(&self, new_path: &str) -> Result<String> {
        let path = self
            .bridge
            .invoke("set_db_path", json!({ "newPath": new_path }))
            .await?;
        path.as_str()
            .map(str::to_string)
            .ok_or_else(|| DevTrackError::bridge(format!("set_db_path returned {path}")))
    }

    fn atomic_bulk(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ChannelBridge;
    use crate::host::DbHost;
    use crate::sqlite::SqliteDb;
    use devtrack_core::config::DevTrackConfig;
    use std::path::PathBuf;

    fn backend() -> NativeBackend {
        let db = SqliteDb::open(&PathBuf::from(":memory:")).unwrap();
        let host = DbHost::with_db(db, DevTrackConfig::default(), None);
        NativeBackend::new(Arc::new(ChannelBridge::connect(host)))
    }

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_bulk_put_merges_with_existing_rows() {
        let backend = backend();
        backend.put(Table::Clients, rec(json!({"id": "A"}))).await.unwrap();
        backend
            .bulk_put(Table::Clients, vec![rec(json!({"id": "B"})), rec(json!({"id": "C"}))])
            .await
            .unwrap();
        backend.bulk_put(Table::Clients, Vec::new()).await.unwrap();
        let mut ids: Vec<String> = backend
            .get_all(Table::Clients)
            .await
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(backend.atomic_bulk());
    }

    #[tokio::test]
    async fn test_fresh_flag_and_location() {
        let backend = backend();
        assert!(backend.is_new_database().await.unwrap());
        backend.mark_initialized().await.unwrap();
        assert!(!backend.is_new_database().await.unwrap());
        assert_eq!(backend.location().await.unwrap().as_deref(), Some(":memory:"));
    }
}
