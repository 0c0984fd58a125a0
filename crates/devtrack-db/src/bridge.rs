//! IPC bridge between the data access service and the storage host.
//!
//! Requests and replies cross the channel as serialized JSON text, the same
//! shape a webview would send to a native shell.

use async_trait::async_trait;
use devtrack_core::error::{DevTrackError, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::host::DbHost;

/// Named-command invocation across a process boundary.
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn invoke(&self, cmd: &str, args: Value) -> Result<Value>;
}

struct Request {
    cmd: String,
    args: String,
    reply: oneshot::Sender<std::result::Result<String, String>>,
}

/// Channel-based bridge to an in-process [`DbHost`].
pub struct ChannelBridge {
    tx: mpsc::Sender<Request>,
}

impl ChannelBridge {
    /// Spawn the host's serve loop and return the caller side.
    pub fn connect(host: Arc<DbHost>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(serve(host, rx));
        Self { tx }
    }
}

#[async_trait]
impl Bridge for ChannelBridge {
    async fn invoke(&self, cmd: &str, args: Value) -> Result<Value> {
        let (reply, answer) = oneshot::channel();
        let request = Request {
            cmd: cmd.to_string(),
            args: serde_json::to_string(&args)?,
            reply,
        };
        self.tx
            .send(request)
            .await
            .map_err(|_| DevTrackError::bridge("Host is not running"))?;
        let text = answer
            .await
            .map_err(|_| DevTrackError::bridge(format!("Host dropped {cmd}")))?
            .map_err(DevTrackError::Bridge)?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn serve(host: Arc<DbHost>, mut rx: mpsc::Receiver<Request>) {
    while let Some(req) = rx.recv().await {
        let host = host.clone();
        tokio::spawn(async move {
            let result = match serde_json::from_str::<Value>(&req.args) {
                Ok(args) => match host.handle(&req.cmd, args).await {
                    Ok(value) => serde_json::to_string(&value).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(format!("Malformed payload for {}: {e}", req.cmd)),
            };
            let _ = req.reply.send(result);
        });
    }
    tracing::debug!("bridge closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteDb;
    use devtrack_core::config::DevTrackConfig;
    use serde_json::json;
    use std::path::PathBuf;

    fn bridge() -> ChannelBridge {
        let db = SqliteDb::open(&PathBuf::from(":memory:")).unwrap();
        ChannelBridge::connect(DbHost::with_db(db, DevTrackConfig::default(), None))
    }

    #[tokio::test]
    async fn test_round_trip_through_channel() {
        let bridge = bridge();
        bridge
            .invoke("db_put", json!({"table": "tickets", "item": {"id": "TIC-1", "budget": 80}}))
            .await
            .unwrap();
        let rows = bridge.invoke("db_get_all", json!({"table": "tickets"})).await.unwrap();
        assert_eq!(rows[0]["budget"].as_f64(), Some(80.0));
    }

    #[tokio::test]
    async fn test_host_errors_become_bridge_errors() {
        let bridge = bridge();
        let err = bridge
            .invoke("db_put", json!({"table": "tickets", "item": {"title": "no id"}}))
            .await
            .unwrap_err();
        match err {
            DevTrackError::Bridge(msg) => assert!(msg.contains("id")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
