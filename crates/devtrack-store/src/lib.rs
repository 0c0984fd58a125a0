//! # DevTrack Store
//!
//! In-memory application state backed by the data access service, plus the
//! reports derived from it: budget consumption, work-log queries, billing
//! and export tables.

pub mod billing;
pub mod consumption;
pub mod export;
pub mod filter;
pub mod guards;
pub mod seed;
pub mod state;

pub use billing::{BillingSummary, billing_summary};
pub use consumption::{ConsumptionFilter, ConsumptionReport, TicketUsage, consumption_report, ticket_usage};
pub use export::ExportTable;
pub use filter::{LogQuery, Period, query_logs};
pub use state::{AppState, AppStore, Phase};
