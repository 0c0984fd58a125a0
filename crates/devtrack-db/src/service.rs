//! Data access service — uniform CRUD over the four tables.
//!
//! The backend is chosen once at construction: the native SQLite host when it
//! answers the bridge probe, the local key-value store otherwise. There is no
//! switching mid-session.

use devtrack_core::config::{BackendKind, DevTrackConfig};
use devtrack_core::error::Result;
use devtrack_core::traits::StorageBackend;
use devtrack_core::types::{Entity, Record, Table};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::{Bridge, ChannelBridge};
use crate::host::DbHost;
use crate::local::LocalBackend;
use crate::native::NativeBackend;

pub struct DataService {
    backend: Arc<dyn StorageBackend>,
}

impl DataService {
    /// Pick and construct the backend described by `config`.
    ///
    /// `config_path` is where the host persists a changed database location.
    pub async fn init(config: &DevTrackConfig, config_path: Option<PathBuf>) -> Result<Self> {
        match config.storage.backend {
            BackendKind::Native => {
                tracing::info!("🗄️ Storage mode: native SQLite (forced)");
                Ok(Self::with_backend(Arc::new(native_backend(config, config_path))))
            }
            BackendKind::Local => {
                tracing::info!("🗄️ Storage mode: local store (forced)");
                Ok(Self::with_backend(Arc::new(LocalBackend::open(&config.local_store_path())?)))
            }
            BackendKind::Auto => {
                let host = DbHost::start(config.clone(), config_path);
                let bridge: Arc<dyn Bridge> = Arc::new(ChannelBridge::connect(host));
                if Self::probe(bridge.as_ref()).await {
                    Ok(Self::with_backend(Arc::new(NativeBackend::new(bridge))))
                } else {
                    let local = LocalBackend::open(&config.local_store_path())?;
                    Ok(Self::with_backend(Arc::new(local)))
                }
            }
        }
    }

    /// Ping the host once. `false` means the native backend is unusable.
    pub async fn probe(bridge: &dyn Bridge) -> bool {
        match bridge.invoke("get_db_path", json!({})).await {
            Ok(path) => {
                tracing::info!("🗄️ Storage mode: native SQLite at {}", path.as_str().unwrap_or("?"));
                true
            }
            Err(e) => {
                tracing::warn!("⚠️ Native storage unavailable ({e}), falling back to local store");
                false
            }
        }
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether `bulk_put` merges into existing rows.
    pub fn atomic_bulk(&self) -> bool {
        self.backend.atomic_bulk()
    }

    pub async fn get_all(&self, table: Table) -> Result<Vec<Record>> {
        self.backend.get_all(table).await
    }

    /// Read policy for startup: a failed read is logged and treated as empty.
    pub async fn get_all_or_empty(&self, table: Table) -> Vec<Record> {
        match self.backend.get_all(table).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("❌ Failed to read {table}: {e}");
                Vec::new()
            }
        }
    }

    pub async fn get_all_as<T: Entity>(&self) -> Result<Vec<T>> {
        Ok(decode_rows(self.get_all(T::TABLE).await?))
    }

    pub async fn put(&self, table: Table, record: Record) -> Result<()> {
        tracing::debug!("put {table}/{}", record.get("id").and_then(|v| v.as_str()).unwrap_or("?"));
        self.backend.put(table, record).await
    }

    pub async fn put_entity<T: Entity>(&self, item: &T) -> Result<()> {
        self.put(T::TABLE, item.to_record()?).await
    }

    pub async fn bulk_put(&self, table: Table, records: Vec<Record>) -> Result<()> {
        tracing::debug!("bulk_put {table}: {} rows", records.len());
        self.backend.bulk_put(table, records).await
    }

    pub async fn bulk_put_entities<T: Entity>(&self, items: &[T]) -> Result<()> {
        let records = items.iter().map(Entity::to_record).collect::<Result<Vec<_>>>()?;
        self.bulk_put(T::TABLE, records).await
    }

    pub async fn delete(&self, table: Table, id: &str) -> Result<()> {
        tracing::debug!("delete {table}/{id}");
        self.backend.delete(table, id).await
    }

    pub async fn clear_all(&self) -> Result<()> {
        tracing::warn!("🗑️ Clearing all tables");
        self.backend.clear_all().await
    }

    pub async fn is_new_database(&self) -> Result<bool> {
        self.backend.is_new_database().await
    }

    pub async fn mark_initialized(&self) -> Result<()> {
        self.backend.mark_initialized().await
    }

    pub async fn location(&self) -> Result<Option<String>> {
        self.backend.location().await
    }

    pub async fn set_db_path(&self, new_path: &str) -> Result<String> {
        self.backend.set_db_path(new_path).await
    }
}

fn native_backend(config: &DevTrackConfig, config_path: Option<PathBuf>) -> NativeBackend {
    let host = DbHost::start(config.clone(), config_path);
    NativeBackend::new(Arc::new(ChannelBridge::connect(host)))
}

/// Decode rows into entities, skipping (and logging) rows that do not fit.
pub fn decode_rows<T: Entity>(rows: Vec<Record>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            match T::from_record(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("⚠️ Skipping undecodable {} row {id}: {e}", T::TABLE);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use devtrack_core::error::DevTrackError;
    use devtrack_core::types::{Client, Ticket};
    use devtrack_core::config::StorageConfig;
    use serde_json::Value;

    struct DeadBridge;

    #[async_trait]
    impl Bridge for DeadBridge {
        async fn invoke(&self, cmd: &str, _args: Value) -> Result<Value> {
            Err(DevTrackError::bridge(format!("no host for {cmd}")))
        }
    }

    struct BrokenBackend;

    #[async_trait]
    impl StorageBackend for BrokenBackend {
        fn name(&self) -> &str { "broken" }
        async fn get_all(&self, _table: Table) -> Result<Vec<Record>> {
            Err(DevTrackError::storage("disk on fire"))
        }
        async fn put(&self, _table: Table, _record: Record) -> Result<()> {
            Err(DevTrackError::storage("disk on fire"))
        }
        async fn bulk_put(&self, _table: Table, _records: Vec<Record>) -> Result<()> {
            Err(DevTrackError::storage("disk on fire"))
        }
        async fn delete(&self, _table: Table, _id: &str) -> Result<()> {
            Err(DevTrackError::storage("disk on fire"))
        }
        async fn clear_all(&self) -> Result<()> {
            Err(DevTrackError::storage("disk on fire"))
        }
        async fn is_new_database(&self) -> Result<bool> {
            Ok(false)
        }
        async fn mark_initialized(&self) -> Result<()> {
            Ok(())
        }
        async fn location(&self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn local_config(dir: &std::path::Path, backend: BackendKind) -> DevTrackConfig {
        DevTrackConfig {
            db_path: Some(dir.join("devtrack.db").to_string_lossy().into_owned()),
            storage: StorageConfig {
                backend,
                local_store: dir.join("local_storage.json").to_string_lossy().into_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_probe_rejects_dead_bridge() {
        assert!(!DataService::probe(&DeadBridge).await);
    }

    #[tokio::test]
    async fn test_auto_prefers_native() {
        let dir = tempfile::tempdir().unwrap();
        let service = DataService::init(&local_config(dir.path(), BackendKind::Auto), None)
            .await
            .unwrap();
        assert_eq!(service.backend_name(), "native");
        assert!(service.atomic_bulk());
    }

    #[tokio::test]
    async fn test_auto_falls_back_when_database_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let mut config = local_config(dir.path(), BackendKind::Auto);
        config.db_path = Some(blocker.join("devtrack.db").to_string_lossy().into_owned());

        let service = DataService::init(&config, None).await.unwrap();
        assert_eq!(service.backend_name(), "local");
        assert!(service.is_new_database().await.unwrap());
    }

    #[tokio::test]
    async fn test_forced_local() {
        let dir = tempfile::tempdir().unwrap();
        let service = DataService::init(&local_config(dir.path(), BackendKind::Local), None)
            .await
            .unwrap();
        assert_eq!(service.backend_name(), "local");
        assert!(!dir.path().join("devtrack.db").exists());
    }

    #[tokio::test]
    async fn test_read_failure_policy() {
        let service = DataService::with_backend(Arc::new(BrokenBackend));
        assert!(service.get_all(Table::Clients).await.is_err());
        assert!(service.get_all_or_empty(Table::Clients).await.is_empty());
    }

    #[tokio::test]
    async fn test_typed_reads_skip_bad_rows() {
        let service = DataService::with_backend(Arc::new(LocalBackend::in_memory()));
        let client = Client::new("Acme", "A", "Main St");
        service.put_entity(&client).await.unwrap();
        service
            .put(Table::Clients, json!({"name": "missing id"}).as_object().unwrap().clone())
            .await
            .unwrap_err();
        let ticket = Ticket::new(&client.id, "CUST-1", "Rollout").with_budget(80.0);
        service.bulk_put_entities(&[ticket.clone()]).await.unwrap();
        service
            .put(Table::Tickets, json!({"id": "TIC-bad", "createdAt": "garbage"}).as_object().unwrap().clone())
            .await
            .unwrap();

        assert_eq!(service.get_all_as::<Client>().await.unwrap(), vec![client]);
        assert_eq!(service.get_all_as::<Ticket>().await.unwrap(), vec![ticket]);
    }
}
