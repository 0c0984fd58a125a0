//! Storage host — owns the SQLite connection and answers bridge commands.
//!
//! The database is opened on a background thread so the caller is not held
//! up at startup. Every command waits for the handle with a short poll loop,
//! bounded by `ready_timeout_ms`.

use devtrack_core::config::DevTrackConfig;
use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::types::{Record, Table};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::sqlite::SqliteDb;

type OpenResult = std::result::Result<Arc<SqliteDb>, String>;

#[derive(Deserialize)]
struct TableArgs {
    table: Table,
}

#[derive(Deserialize)]
struct PutArgs {
    table: Table,
    item: Record,
}

#[derive(Deserialize)]
struct BulkPutArgs {
    table: Table,
    items: Vec<Record>,
}

#[derive(Deserialize)]
struct DeleteArgs {
    table: Table,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathArgs {
    new_path: String,
}

/// Host side of the native bridge.
pub struct DbHost {
    db: Arc<OnceLock<OpenResult>>,
    config: Mutex<DevTrackConfig>,
    /// Where `set_db_path` persists the config. `None` keeps changes in memory.
    config_path: Option<PathBuf>,
    poll: Duration,
    timeout: Duration,
}

impl DbHost {
    /// Start opening the configured database in the background.
    pub fn start(config: DevTrackConfig, config_path: Option<PathBuf>) -> Arc<Self> {
        let path = config.resolve_db_path();
        let cell: Arc<OnceLock<OpenResult>> = Arc::new(OnceLock::new());

        let slot = cell.clone();
        let spawned = std::thread::Builder::new()
            .name("devtrack-db-open".into())
            .spawn(move || {
                let opened = SqliteDb::open(&path).map(Arc::new).map_err(|e| {
                    tracing::error!("❌ Failed to open database {}: {e}", path.display());
                    e.to_string()
                });
                let _ = slot.set(opened);
            });
        if let Err(e) = spawned {
            let _ = cell.set(Err(format!("Failed to spawn database thread: {e}")));
        }

        Self::with_cell(cell, config, config_path)
    }

    /// Host over an already opened database.
    pub fn with_db(db: SqliteDb, config: DevTrackConfig, config_path: Option<PathBuf>) -> Arc<Self> {
        let cell = Arc::new(OnceLock::new());
        let _ = cell.set(Ok(Arc::new(db)));
        Self::with_cell(cell, config, config_path)
    }

    fn with_cell(
        cell: Arc<OnceLock<OpenResult>>,
        config: DevTrackConfig,
        config_path: Option<PathBuf>,
    ) -> Arc<Self> {
        let poll = Duration::from_millis(config.storage.ready_poll_ms.max(1));
        let timeout = Duration::from_millis(config.storage.ready_timeout_ms);
        Arc::new(Self {
            db: cell,
            config: Mutex::new(config),
            config_path,
            poll,
            timeout,
        })
    }

    /// Wait until the background open finished.
    async fn ready(&self) -> Result<Arc<SqliteDb>> {
        let started = Instant::now();
        loop {
            if let Some(opened) = self.db.get() {
                return opened.clone().map_err(DevTrackError::Storage);
            }
            if started.elapsed() >= self.timeout {
                return Err(DevTrackError::storage(format!(
                    "Database not ready after {} ms",
                    self.timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteDb) -> Result<T> + Send + 'static,
    {
        let db = self.ready().await?;
        tokio::task::spawn_blocking(move || op(db.as_ref()))
            .await
            .map_err(|e| DevTrackError::storage(format!("Database task failed: {e}")))?
    }

    /// Dispatch one named command.
    pub async fn handle(&self, cmd: &str, args: Value) -> Result<Value> {
        tracing::debug!("host command: {cmd}");
        match cmd {
            "get_db_path" => {
                let db = self.ready().await?;
                Ok(Value::String(db.path().to_string_lossy().into_owned()))
            }
            "is_new_database" => Ok(Value::Bool(self.ready().await?.is_new())),
            "mark_initialized" => {
                self.ready().await?.mark_initialized();
                Ok(Value::Null)
            }
            "db_get_all" => {
                let TableArgs { table } = parse_args(cmd, args)?;
                let rows = self.blocking(move |db| db.get_all(table)).await?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
            "db_put" => {
                let PutArgs { table, item } = parse_args(cmd, args)?;
                self.blocking(move |db| db.put(table, &item)).await?;
                Ok(Value::Null)
            }
            "db_bulk_put" => {
                let BulkPutArgs { table, items } = parse_args(cmd, args)?;
                self.blocking(move |db| db.bulk_put(table, &items)).await?;
                Ok(Value::Null)
            }
            "db_delete" => {
                let DeleteArgs { table, id } = parse_args(cmd, args)?;
                self.blocking(move |db| db.delete(table, &id)).await?;
                Ok(Value::Null)
            }
            "db_clear_all" => {
                self.blocking(|db| db.clear_all()).await?;
                Ok(Value::Null)
            }
            "set_db_path" => {
                let PathArgs { new_path } = parse_args(cmd, args)?;
                let path = self.set_db_path(&new_path).await?;
                Ok(Value::String(path))
            }
            other => Err(DevTrackError::bridge(format!("Unknown command: {other}"))),
        }
    }

    async fn set_db_path(&self, new_path: &str) -> Result<String> {
        let mut config = self.config.lock().await;
        match self.ready().await {
            Ok(_) => self.blocking(|db| db.checkpoint()).await?,
            Err(e) => tracing::warn!("⚠️ Relocating without checkpoint: {e}"),
        }
        let mut updated = config.clone();
        let target = updated.relocate_db(new_path)?;
        if let Some(path) = &self.config_path {
            updated.save_to(path)?;
        }
        *config = updated;
        tracing::info!("📁 Database path set to {} (active after restart)", target.display());
        Ok(target.to_string_lossy().into_owned())
    }
}

fn parse_args<T: DeserializeOwned>(cmd: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| DevTrackError::bridge(format!("Invalid arguments for {cmd}: {e}")))
}
