//! # DevTrack DB
//!
//! SQLite storage host, the JSON bridge that fronts it, the native and
//! local-fallback backends, and the data access service that picks one.

pub mod bridge;
pub mod host;
pub mod kv;
pub mod local;
pub mod native;
pub mod schema;
pub mod service;
pub mod sqlite;

pub use bridge::{Bridge, ChannelBridge};
pub use host::DbHost;
pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use local::LocalBackend;
pub use native::NativeBackend;
pub use service::DataService;
pub use sqlite::SqliteDb;
