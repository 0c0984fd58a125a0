//! # DevTrack — local project, time log and billing tracker
//!
//! Command-line shell over the DevTrack state store.
//!
//! Usage:
//!   devtrack info                              # Storage mode, location, counts
//!   devtrack list tickets                      # Rows of the selected tenant
//!   devtrack put clients '{"name":"Acme"}'     # Insert or update a row
//!   devtrack delete customers CUST-001         # Guarded delete
//!   devtrack bill --invoice INV-100 LOG-1 LOG-2
//!   devtrack export timesheet --out ts.json

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use devtrack_core::config::{BackendKind, DevTrackConfig};
use devtrack_core::types::{Client, Customer, Entity, Record, Table, Ticket, WorkLog};
use devtrack_db::DataService;
use devtrack_store::export::{self, ExportTable};
use devtrack_store::state::Cached;
use devtrack_store::{AppStore, ConsumptionFilter, LogQuery, Period};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devtrack", version, about = "📒 DevTrack — projects, time logs and billing")]
struct Cli {
    /// Config file (default: ~/.devtrack/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Override the configured storage backend
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Tenant to scope views to (default: first client)
    #[arg(long)]
    client: Option<String>,

    /// Show every tenant
    #[arg(long, conflicts_with = "client")]
    all_clients: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Native,
    Local,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendKind::Auto,
            BackendArg::Native => BackendKind::Native,
            BackendArg::Local => BackendKind::Local,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Timesheet,
    Billing,
    Tickets,
    Consumption,
    Customers,
    Clients,
}

#[derive(Subcommand)]
enum Command {
    /// Storage mode, database location and row counts
    Info,
    /// Print the rows of a table as JSON
    List { table: Table },
    /// Insert or update a row from a JSON object (`@file` reads a file)
    Put { table: Table, json: String },
    /// Delete a row, refusing when other rows still reference it
    Delete {
        table: Table,
        id: String,
        /// Skip the reference checks
        #[arg(long)]
        force: bool,
    },
    /// Hour budget consumption per ticket
    Consumption {
        /// Include Done and Cancelled tickets
        #[arg(long)]
        completed: bool,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Query work logs
    Logs {
        #[command(flatten)]
        filter: LogFilterArgs,
    },
    /// Assign an invoice to work logs
    Bill {
        #[arg(long)]
        invoice: String,
        /// Billing date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove invoice data from work logs
    Unbill {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Build an export table and write it as JSON records
    Export {
        #[arg(value_enum)]
        kind: ExportKind,
        #[command(flatten)]
        filter: LogFilterArgs,
        /// Output file (default: <suggested name>.json)
        #[arg(long)]
        out: Option<String>,
    },
    /// Move the database file (takes effect on next start)
    SetDbPath { path: String },
    /// Delete every row in every table
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Args, Default)]
struct LogFilterArgs {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// day, week, month or year around --from (or today)
    #[arg(long)]
    period: Option<Period>,
    #[arg(long)]
    customer: Option<String>,
    #[arg(long)]
    ticket: Option<String>,
    #[arg(long)]
    unbilled: bool,
    #[arg(long)]
    search: Option<String>,
}

impl LogFilterArgs {
    fn to_query(&self) -> LogQuery {
        let query = LogQuery {
            from: self.from,
            to: self.to,
            customer_id: self.customer.clone(),
            ticket_id: self.ticket.clone(),
            unbilled_only: self.unbilled,
            search: self.search.clone(),
        };
        match self.period {
            Some(period) => {
                let anchor = self.from.unwrap_or_else(today);
                query.in_period(period.range(anchor))
            }
            None => query,
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).as_ref())
}

fn init_logging(config: &DevTrackConfig, verbose: bool) {
    let default = if verbose {
        "devtrack=debug,devtrack_db=debug,devtrack_store=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Decode a user-supplied row, filling in the id (and creation date for tickets).
fn parse_entity<T: Entity>(text: &str) -> Result<T> {
    let text = match text.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(expand_path(path))
            .with_context(|| format!("Failed to read {path}"))?,
        None => text.to_string(),
    };
    let mut record: Record = serde_json::from_str(&text).context("Row must be a JSON object")?;
    record
        .entry("id")
        .or_insert_with(|| Value::String(devtrack_core::ids::next_id(T::ID_PREFIX)));
    if T::TABLE == Table::Tickets {
        record
            .entry("createdAt")
            .or_insert_with(|| Value::String(today().to_string()));
    }
    Ok(T::from_record(record)?)
}

async fn put_row<T: Cached>(store: &AppStore, text: &str) -> Result<()> {
    let item: T = parse_entity(text)?;
    let id = item.id().to_string();
    store.put_entity(item).await?;
    println!("✅ Saved {} {id}", T::TABLE);
    Ok(())
}

fn write_export(table: &ExportTable, out: Option<&str>) -> Result<()> {
    let path = match out {
        Some(p) => expand_path(p),
        None => PathBuf::from(format!("{}.json", table.filename)),
    };
    std::fs::write(&path, serde_json::to_string_pretty(&table.to_records())?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("📤 Exported {} row(s) to {}", table.rows.len(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(p) => expand_path(p),
        None => DevTrackConfig::default_path(),
    };
    let mut config = if config_path.exists() {
        DevTrackConfig::load_from(&config_path)?
    } else {
        DevTrackConfig::default()
    };
    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }
    init_logging(&config, cli.verbose);

    let service = DataService::init(&config, Some(config_path)).await?;
    let store = Arc::new(AppStore::new(service));
    store.hydrate().await?;

    if cli.all_clients {
        store.select_client(None).await?;
    } else if let Some(id) = cli.client.as_deref() {
        store.select_client(Some(id)).await?;
    }

    match cli.command {
        Command::Info => {
            let state = store.snapshot().await;
            println!("📒 DevTrack");
            println!("   Storage:  {}", store.service().backend_name());
            println!(
                "   Location: {}",
                state.db_location.as_deref().unwrap_or("in-memory")
            );
            println!(
                "   Tenant:   {}",
                state.selected_client().map(|c| c.name.as_str()).unwrap_or("all")
            );
            println!("   Clients:   {}", state.clients.len());
            println!("   Customers: {}", state.customers.len());
            println!("   Tickets:   {}", state.tickets.len());
            println!("   Logs:      {}", state.logs.len());
        }
        Command::List { table } => {
            let state = store.snapshot().await;
            match table {
                Table::Clients => print_json(&state.clients)?,
                Table::Customers => print_json(&state.filtered_customers())?,
                Table::Tickets => print_json(&state.filtered_tickets())?,
                Table::Worklogs => print_json(&state.filtered_logs())?,
            }
        }
        Command::Put { table, json } => match table {
            Table::Clients => put_row::<Client>(&store, &json).await?,
            Table::Customers => put_row::<Customer>(&store, &json).await?,
            Table::Tickets => put_row::<Ticket>(&store, &json).await?,
            Table::Worklogs => put_row::<WorkLog>(&store, &json).await?,
        },
        Command::Delete { table, id, force } => {
            if force {
                store.delete_entity(table, &id).await?;
            } else {
                store.safe_delete(table, &id).await?;
            }
            println!("🗑️ Deleted {table} {id}");
        }
        Command::Consumption { completed, customer } => {
            let state = store.snapshot().await;
            let filter = ConsumptionFilter {
                show_completed: completed,
                customer_id: customer.as_deref(),
            };
            let report = devtrack_store::consumption_report(
                &state.filtered_tickets(),
                &state.logs,
                &state.customers,
                &filter,
            );
            print_json(&report)?;
        }
        Command::Logs { filter } => {
            let state = store.snapshot().await;
            let logs = devtrack_store::query_logs(
                &state.filtered_logs(),
                &state.tickets,
                &state.customers,
                &filter.to_query(),
            );
            let summary = devtrack_store::billing_summary(&logs);
            print_json(&logs)?;
            println!(
                "⏱️ {:.1} h total ({:.1} h billed, {:.1} h unbilled)",
                summary.billed_hours + summary.unbilled_hours,
                summary.billed_hours,
                summary.unbilled_hours
            );
        }
        Command::Bill { invoice, date, ids } => {
            let n = store.bill_logs(&ids, &invoice, date.unwrap_or_else(today)).await?;
            println!("🧾 {n} log(s) billed on {invoice}");
        }
        Command::Unbill { ids } => {
            let n = store.cancel_billing(&ids).await?;
            println!("🧾 Billing removed from {n} log(s)");
        }
        Command::Export { kind, filter, out } => {
            let state = store.snapshot().await;
            let logs = devtrack_store::query_logs(
                &state.filtered_logs(),
                &state.tickets,
                &state.customers,
                &filter.to_query(),
            );
            let table = match kind {
                ExportKind::Timesheet => export::timesheet_export(&logs, &state.tickets, &state.customers),
                ExportKind::Billing => export::billing_export(&logs, &state.customers),
                ExportKind::Tickets => {
                    export::tickets_export(&state.filtered_tickets(), &state.logs, &state.customers)
                }
                ExportKind::Consumption => {
                    let report = devtrack_store::consumption_report(
                        &state.filtered_tickets(),
                        &state.logs,
                        &state.customers,
                        &ConsumptionFilter::default(),
                    );
                    export::consumption_export(&report)
                }
                ExportKind::Customers => export::customers_export(&state.filtered_customers()),
                ExportKind::Clients => export::clients_export(&state.clients),
            };
            write_export(&table, out.as_deref())?;
        }
        Command::SetDbPath { path } => match store.set_db_path(&path).await {
            Ok(new_path) => {
                println!("📁 Database will be loaded from {new_path} after restart");
            }
            Err(e) => bail!("Could not change database location: {e}"),
        },
        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to wipe all data without --yes");
            }
            store.clear_database().await?;
            println!("🔄 All tables cleared");
        }
    }

    Ok(())
}
