//! # DevTrack Core
//!
//! Entity types, configuration, error type and the storage strategy trait
//! shared by every DevTrack crate.

pub mod config;
pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

pub use config::DevTrackConfig;
pub use error::{DevTrackError, Result};
pub use traits::StorageBackend;
pub use types::{Client, Customer, Entity, Invoice, Priority, Record, Status, Table, Ticket, TicketRef, WorkLog};
