//! Referential checks run before a guarded delete.

use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::types::Table;

use crate::state::AppState;

/// Refuse to delete a row that still has children in the cache.
///
/// A client needs zero customers, a customer zero tickets and zero logs,
/// a ticket zero logs. Work logs are never blocked.
pub fn check_delete(state: &AppState, table: Table, id: &str) -> Result<()> {
    let reason = match table {
        Table::Clients => {
            let n = state.customers.iter().filter(|c| c.client_id == id).count();
            (n > 0).then(|| format!("{n} customer(s) still belong to this client"))
        }
        Table::Customers => {
            let tickets = state.tickets.iter().filter(|t| t.customer_id == id).count();
            let logs = state.logs.iter().filter(|l| l.customer_id == id).count();
            (tickets + logs > 0)
                .then(|| format!("{tickets} ticket(s) and {logs} work log(s) reference this customer"))
        }
        Table::Tickets => {
            let n = state
                .logs
                .iter()
                .filter(|l| l.ticket_id.as_deref() == Some(id))
                .count();
            (n > 0).then(|| format!("{n} work log(s) are booked on this ticket"))
        }
        Table::Worklogs => None,
    };

    match reason {
        Some(reason) => Err(DevTrackError::DeleteBlocked {
            table,
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use devtrack_core::types::{Client, Customer, Ticket, WorkLog};

    fn state() -> AppState {
        let client = Client { id: "CLI-1".into(), name: "Acme".into(), code: "A".into(), address: String::new() };
        let mut customer = Customer::new("CLI-1", "Globex", "");
        customer.id = "CUST-1".into();
        let mut ticket = Ticket::new("CLI-1", "CUST-1", "Rollout");
        ticket.id = "TIC-1".into();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let log = WorkLog::new("CLI-1", "CUST-1", date, 4.0, "").for_ticket("TIC-1");
        AppState {
            clients: vec![client],
            customers: vec![customer],
            tickets: vec![ticket],
            logs: vec![log],
            ..Default::default()
        }
    }

    #[test]
    fn test_parents_with_children_are_blocked() {
        let state = state();
        for (table, id) in [(Table::Clients, "CLI-1"), (Table::Customers, "CUST-1"), (Table::Tickets, "TIC-1")] {
            let err = check_delete(&state, table, id).unwrap_err();
            assert!(err.is_delete_blocked(), "{table} {id} should be blocked");
        }
    }

    #[test]
    fn test_customer_blocked_by_logs_alone() {
        let mut state = state();
        state.tickets.clear();
        assert!(check_delete(&state, Table::Customers, "CUST-1").is_err());
        state.logs.clear();
        assert!(check_delete(&state, Table::Customers, "CUST-1").is_ok());
    }

    #[test]
    fn test_manual_logs_do_not_block_tickets() {
        let mut state = state();
        state.logs[0] = state.logs[0].clone().for_manual("TIC-1", None);
        assert!(check_delete(&state, Table::Tickets, "TIC-1").is_ok());
    }

    #[test]
    fn test_leaf_rows_and_unknown_ids_pass() {
        let state = state();
        let log_id = state.logs[0].id.clone();
        assert!(check_delete(&state, Table::Worklogs, &log_id).is_ok());
        assert!(check_delete(&state, Table::Clients, "CLI-404").is_ok());
    }
}
