//! Hour budget consumption per ticket.

use devtrack_core::types::{Customer, Status, Ticket, WorkLog};
use serde::Serialize;

pub const HOURS_PER_DAY: f64 = 8.0;

/// Hours booked on a ticket against its budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TicketUsage {
    pub spent: f64,
    /// Budget minus spent, negative when over budget.
    pub remaining: f64,
}

/// Sum of hours of logs linked to `ticket`. Manual references are not counted.
pub fn spent_hours(ticket: &Ticket, logs: &[WorkLog]) -> f64 {
    logs.iter()
        .filter(|l| l.ticket_id.as_deref() == Some(ticket.id.as_str()))
        .map(|l| l.hours)
        .sum()
}

pub fn ticket_usage(ticket: &Ticket, logs: &[WorkLog]) -> TicketUsage {
    let spent = spent_hours(ticket, logs);
    TicketUsage {
        spent,
        remaining: ticket.budget.unwrap_or(0.0) - spent,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRow {
    pub ticket_id: String,
    pub external_ref: String,
    pub title: String,
    pub customer_name: String,
    pub status: Status,
    pub budget: f64,
    pub spent: f64,
    /// Never below zero.
    pub remaining: f64,
    /// 0..=100, 0 without a budget.
    pub progress: f64,
    pub spent_days: f64,
    pub remaining_days: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReport {
    pub rows: Vec<ConsumptionRow>,
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConsumptionFilter<'a> {
    /// Include Done and Cancelled tickets.
    pub show_completed: bool,
    pub customer_id: Option<&'a str>,
}

pub fn consumption_report(
    tickets: &[Ticket],
    logs: &[WorkLog],
    customers: &[Customer],
    filter: &ConsumptionFilter<'_>,
) -> ConsumptionReport {
    let rows: Vec<ConsumptionRow> = tickets
        .iter()
        .filter(|t| filter.show_completed || !t.status.is_closed())
        .filter(|t| filter.customer_id.is_none_or(|c| t.customer_id == c))
        .map(|ticket| {
            let spent = spent_hours(ticket, logs);
            let budget = ticket.budget.unwrap_or(0.0);
            let remaining = (budget - spent).max(0.0);
            let progress = if budget > 0.0 {
                (spent / budget * 100.0).min(100.0)
            } else {
                0.0
            };
            let customer_name = customers
                .iter()
                .find(|c| c.id == ticket.customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown customer".to_string());
            ConsumptionRow {
                ticket_id: ticket.id.clone(),
                external_ref: ticket.external_ref.clone(),
                title: ticket.title.clone(),
                customer_name,
                status: ticket.status,
                budget,
                spent,
                remaining,
                progress,
                spent_days: spent / HOURS_PER_DAY,
                remaining_days: remaining / HOURS_PER_DAY,
            }
        })
        .collect();

    ConsumptionReport {
        total_budget: rows.iter().map(|r| r.budget).sum(),
        total_spent: rows.iter().map(|r| r.spent).sum(),
        total_remaining: rows.iter().map(|r| r.remaining).sum(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn fixture() -> (Ticket, Vec<WorkLog>, Vec<Customer>) {
        let mut ticket = Ticket::new("CLI-1", "CUST-1", "Rollout").with_budget(80.0);
        ticket.id = "TIC-1".into();
        let logs = vec![
            WorkLog::new("CLI-1", "CUST-1", date(2), 4.0, "").for_ticket("TIC-1"),
            WorkLog::new("CLI-1", "CUST-1", date(3), 6.0, "").for_ticket("TIC-1"),
            WorkLog::new("CLI-1", "CUST-1", date(4), 3.0, "").for_manual("TIC-1", None),
        ];
        let mut customer = Customer::new("CLI-1", "Globex", "");
        customer.id = "CUST-1".into();
        (ticket, logs, vec![customer])
    }

    #[test]
    fn test_usage_counts_linked_logs_only() {
        let (ticket, logs, _) = fixture();
        let usage = ticket_usage(&ticket, &logs);
        assert_eq!(usage.spent, 10.0);
        assert_eq!(usage.remaining, 70.0);
    }

    #[test]
    fn test_usage_goes_negative_over_budget() {
        let (ticket, logs, _) = fixture();
        let ticket = ticket.with_budget(5.0);
        assert_eq!(ticket_usage(&ticket, &logs).remaining, -5.0);
    }

    #[test]
    fn test_report_row() {
        let (ticket, logs, customers) = fixture();
        let report = consumption_report(&[ticket], &logs, &customers, &ConsumptionFilter::default());
        let row = &report.rows[0];
        assert_eq!(row.spent, 10.0);
        assert_eq!(row.remaining, 70.0);
        assert_eq!(row.progress, 12.5);
        assert_eq!(row.spent_days, 1.25);
        assert_eq!(row.customer_name, "Globex");
        assert_eq!(report.total_budget, 80.0);
    }

    #[test]
    fn test_report_clamps_and_caps() {
        let (ticket, logs, customers) = fixture();
        let over = ticket.clone().with_budget(5.0);
        let mut no_budget = ticket;
        no_budget.id = "TIC-2".into();
        no_budget.budget = None;

        let report = consumption_report(&[over, no_budget], &logs, &customers, &ConsumptionFilter::default());
        assert_eq!(report.rows[0].remaining, 0.0);
        assert_eq!(report.rows[0].progress, 100.0);
        assert_eq!(report.rows[1].progress, 0.0);
        assert_eq!(report.rows[1].spent, 0.0);
    }

    #[test]
    fn test_report_hides_closed_tickets() {
        let (mut ticket, logs, customers) = fixture();
        ticket.status = Status::Done;
        let tickets = [ticket];
        assert!(consumption_report(&tickets, &logs, &customers, &ConsumptionFilter::default()).rows.is_empty());

        let filter = ConsumptionFilter { show_completed: true, customer_id: Some("CUST-1") };
        assert_eq!(consumption_report(&tickets, &logs, &customers, &filter).rows.len(), 1);

        let filter = ConsumptionFilter { show_completed: true, customer_id: Some("CUST-9") };
        assert!(consumption_report(&tickets, &logs, &customers, &filter).rows.is_empty());
    }
}
