//! Application state store — the in-memory mirror of the four tables.
//!
//! `AppStore` is shared as `Arc<AppStore>`. Every mutation goes to storage
//! first; the cache only changes after the backend accepted the write.

use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::types::{Client, Customer, Entity, Table, Ticket, WorkLog};
use devtrack_db::DataService;
use devtrack_db::service::decode_rows;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::guards;
use crate::seed;

/// Startup progress of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    Seeding,
    Ready,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub clients: Vec<Client>,
    pub customers: Vec<Customer>,
    pub tickets: Vec<Ticket>,
    pub logs: Vec<WorkLog>,
    /// Kept pointing at an existing client by `select_client` and `delete_entity`.
    pub selected_client_id: Option<String>,
    pub db_location: Option<String>,
    pub phase: Phase,
}

impl AppState {
    /// `selected_client_id` must name a cached client; a dangling id empties every view.
    fn in_tenant(&self, client_id: &str) -> bool {
        self.selected_client_id
            .as_deref()
            .is_none_or(|selected| selected == client_id)
    }

    pub fn filtered_tickets(&self) -> Vec<Ticket> {
        self.tickets.iter().filter(|t| self.in_tenant(&t.client_id)).cloned().collect()
    }

    pub fn filtered_logs(&self) -> Vec<WorkLog> {
        self.logs.iter().filter(|l| self.in_tenant(&l.client_id)).cloned().collect()
    }

    pub fn filtered_customers(&self) -> Vec<Customer> {
        self.customers.iter().filter(|c| self.in_tenant(&c.client_id)).cloned().collect()
    }

    pub fn selected_client(&self) -> Option<&Client> {
        let id = self.selected_client_id.as_deref()?;
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }
}

/// Entities the store keeps a cached collection for.
pub trait Cached: Entity {
    fn collection(state: &mut AppState) -> &mut Vec<Self>;
}

impl Cached for Client {
    fn collection(state: &mut AppState) -> &mut Vec<Self> { &mut state.clients }
}

impl Cached for Customer {
    fn collection(state: &mut AppState) -> &mut Vec<Self> { &mut state.customers }
}

impl Cached for Ticket {
    fn collection(state: &mut AppState) -> &mut Vec<Self> { &mut state.tickets }
}

impl Cached for WorkLog {
    fn collection(state: &mut AppState) -> &mut Vec<Self> { &mut state.logs }
}

/// Replace by id, or append.
pub(crate) fn upsert<T: Entity>(items: &mut Vec<T>, item: T) {
    match items.iter().position(|x| x.id() == item.id()) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

pub struct AppStore {
    pub(crate) service: DataService,
    pub(crate) state: RwLock<AppState>,
    hydrating: Mutex<()>,
}

impl AppStore {
    pub fn new(service: DataService) -> Self {
        Self {
            service,
            state: RwLock::new(AppState::default()),
            hydrating: Mutex::new(()),
        }
    }

    pub fn service(&self) -> &DataService {
        &self.service
    }

    /// Load everything from storage, seeding demo data into a fresh store.
    ///
    /// Runs once; calling it again after success is a no-op. A failed run
    /// leaves the phase at `Loading` and may be retried.
    pub async fn hydrate(&self) -> Result<()> {
        let _guard = self.hydrating.lock().await;
        {
            let mut state = self.state.write().await;
            if state.phase == Phase::Ready {
                return Ok(());
            }
            state.phase = Phase::Loading;
        }

        match self.load().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.write().await.phase = Phase::Loading;
                tracing::error!("❌ Failed to load application data: {e}");
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<()> {
        let svc = &self.service;
        let location = svc.location().await.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not resolve storage location: {e}");
            None
        });
        let is_new = svc.is_new_database().await?;

        let (clients, customers, tickets, logs) = tokio::join!(
            svc.get_all_or_empty(Table::Clients),
            svc.get_all_or_empty(Table::Customers),
            svc.get_all_or_empty(Table::Tickets),
            svc.get_all_or_empty(Table::Worklogs),
        );
        let mut clients: Vec<Client> = decode_rows(clients);
        let mut customers: Vec<Customer> = decode_rows(customers);
        let mut tickets: Vec<Ticket> = decode_rows(tickets);
        let mut logs: Vec<WorkLog> = decode_rows(logs);

        if is_new {
            self.state.write().await.phase = Phase::Seeding;
            let demo = seed::demo_data();
            tokio::try_join!(
                svc.bulk_put_entities(&demo.tickets),
                svc.bulk_put_entities(&demo.logs),
                svc.bulk_put_entities(&demo.customers),
                svc.bulk_put_entities(&demo.clients),
            )?;
            svc.mark_initialized().await?;
            tracing::info!("🌱 Seeded demo data into a new database");
            clients = demo.clients;
            customers = demo.customers;
            tickets = demo.tickets;
            logs = demo.logs;
        }

        let mut state = self.state.write().await;
        state.clients = clients;
        state.customers = customers;
        state.tickets = tickets;
        state.logs = logs;
        state.db_location = location;
        if state.selected_client_id.is_none() {
            state.selected_client_id = state.clients.first().map(|c| c.id.clone());
        }
        state.phase = Phase::Ready;
        tracing::info!(
            "✅ Loaded {} clients, {} customers, {} tickets, {} logs ({})",
            state.clients.len(),
            state.customers.len(),
            state.tickets.len(),
            state.logs.len(),
            self.service.backend_name()
        );
        Ok(())
    }

    /// Persist one entity and mirror it in memory.
    pub async fn put_entity<T: Cached>(&self, item: T) -> Result<()> {
        self.service.put_entity(&item).await?;

        let mut state = self.state.write().await;
        let id = item.id().to_string();
        upsert(T::collection(&mut state), item);
        if T::TABLE == Table::Clients && state.selected_client_id.is_none() {
            state.selected_client_id = Some(id);
        }
        Ok(())
    }

    /// Delete without referential checks. See [`AppStore::safe_delete`].
    pub async fn delete_entity(&self, table: Table, id: &str) -> Result<()> {
        self.service.delete(table, id).await?;

        let mut state = self.state.write().await;
        match table {
            Table::Clients => {
                state.clients.retain(|c| c.id != id);
                if state.selected_client_id.as_deref() == Some(id) {
                    state.selected_client_id = state.clients.first().map(|c| c.id.clone());
                }
            }
            Table::Customers => state.customers.retain(|c| c.id != id),
            Table::Tickets => state.tickets.retain(|t| t.id != id),
            Table::Worklogs => state.logs.retain(|l| l.id != id),
        }
        Ok(())
    }

    /// Delete only when no child rows reference the entity.
    pub async fn safe_delete(&self, table: Table, id: &str) -> Result<()> {
        {
            let state = self.state.read().await;
            guards::check_delete(&state, table, id)?;
        }
        self.delete_entity(table, id).await
    }

    /// Wipe storage and start over with empty tables (no demo data).
    pub async fn clear_database(&self) -> Result<()> {
        self.service.clear_all().await?;
        self.service.mark_initialized().await?;
        *self.state.write().await = AppState::default();
        tracing::info!("🔄 Database cleared, reloading");
        self.hydrate().await
    }

    /// Change the tenant. `None` shows every tenant.
    pub async fn select_client(&self, id: Option<&str>) -> Result<()> {
        let mut state = self.state.write().await;
        match id {
            Some(id) if !state.clients.iter().any(|c| c.id == id) => {
                Err(DevTrackError::InvalidRecord(format!("Unknown client {id}")))
            }
            _ => {
                state.selected_client_id = id.map(str::to_string);
                Ok(())
            }
        }
    }

    /// Move the database file; effective after restart.
    pub async fn set_db_path(&self, new_path: &str) -> Result<String> {
        self.service.set_db_path(new_path).await
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub async fn filtered_tickets(&self) -> Vec<Ticket> {
        self.state.read().await.filtered_tickets()
    }

    pub async fn filtered_logs(&self) -> Vec<WorkLog> {
        self.state.read().await.filtered_logs()
    }

    pub async fn filtered_customers(&self) -> Vec<Customer> {
        self.state.read().await.filtered_customers()
    }
}
