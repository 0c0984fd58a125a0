//! Spreadsheet-ready tables for the export actions.
//!
//! Dates are rendered `DD.MM.YYYY`, hours stay numeric.

use chrono::NaiveDate;
use devtrack_core::types::{Client, Customer, Ticket, WorkLog};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::consumption::{ConsumptionReport, ticket_usage};

const EXPORT_DATE: &str = "%d.%m.%Y";

pub fn format_export_date(date: NaiveDate) -> String {
    date.format(EXPORT_DATE).to_string()
}

pub fn parse_export_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), EXPORT_DATE).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    /// Suggested file name without extension.
    pub filename: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ExportTable {
    fn new(filename: &str, headers: &[&str]) -> Self {
        Self {
            filename: filename.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    /// One JSON object per row, keyed by header.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| self.headers.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    pub fn column(&self, header: &str) -> Option<Vec<&Value>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }
}

fn customer_name<'a>(customers: &'a [Customer], id: &str) -> &'a str {
    customers
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
        .unwrap_or("Unknown")
}

fn find_ticket<'a>(tickets: &'a [Ticket], log: &WorkLog) -> Option<&'a Ticket> {
    let id = log.ticket_id.as_deref()?;
    tickets.iter().find(|t| t.id == id)
}

fn opt_date(date: Option<NaiveDate>, missing: &str) -> Value {
    Value::String(date.map(format_export_date).unwrap_or_else(|| missing.to_string()))
}

/// Timesheet of hours per day and project.
pub fn timesheet_export(logs: &[WorkLog], tickets: &[Ticket], customers: &[Customer]) -> ExportTable {
    let mut table = ExportTable::new(
        "Timesheet_Export",
        &["Date", "Customer", "Project", "Module", "Description", "Hours"],
    );
    for log in logs {
        let ticket = find_ticket(tickets, log);
        let project = ticket
            .map(|t| t.external_ref.as_str())
            .filter(|s| !s.is_empty())
            .or(log.manual_ticket_id.as_deref())
            .unwrap_or("Manual");
        let module = ticket
            .map(|t| t.module.as_str())
            .filter(|s| !s.is_empty())
            .or(log.manual_module.as_deref())
            .unwrap_or("N/A");
        table.push(vec![
            json!(format_export_date(log.date)),
            json!(customer_name(customers, &log.customer_id)),
            json!(project),
            json!(module),
            json!(log.description),
            json!(log.hours),
        ]);
    }
    table
}

pub fn billing_export(logs: &[WorkLog], customers: &[Customer]) -> ExportTable {
    let mut table = ExportTable::new(
        "Billing_Export",
        &["Date", "Customer", "Hours", "Invoice", "Billing date"],
    );
    for log in logs {
        table.push(vec![
            json!(format_export_date(log.date)),
            json!(customer_name(customers, &log.customer_id)),
            json!(log.hours),
            json!(log.invoice_number.as_deref().unwrap_or("Unbilled")),
            opt_date(log.billing_date, "-"),
        ]);
    }
    table
}

pub fn tickets_export(tickets: &[Ticket], logs: &[WorkLog], customers: &[Customer]) -> ExportTable {
    let mut table = ExportTable::new(
        "Project_List",
        &[
            "Project ID", "Customer", "Title", "Status", "Priority",
            "Budget (h)", "Spent (h)", "Remaining (h)", "Deadline",
        ],
    );
    for ticket in tickets {
        let usage = ticket_usage(ticket, logs);
        table.push(vec![
            json!(ticket.external_ref),
            json!(customer_name(customers, &ticket.customer_id)),
            json!(ticket.title),
            json!(ticket.status.to_string()),
            json!(ticket.priority.to_string()),
            ticket.budget.map_or(Value::Null, |b| json!(b)),
            json!(usage.spent),
            json!(usage.remaining),
            opt_date(ticket.due_date, ""),
        ]);
    }
    table
}

pub fn consumption_export(report: &ConsumptionReport) -> ExportTable {
    let mut table = ExportTable::new(
        "Project_Consumption",
        &["Project ID", "Customer", "Project title", "Budget (h)", "Spent (h)", "Remaining (h)", "Status"],
    );
    for row in &report.rows {
        table.push(vec![
            json!(row.external_ref),
            json!(row.customer_name),
            json!(row.title),
            json!(row.budget),
            json!(row.spent),
            json!(row.remaining),
            json!(row.status.to_string()),
        ]);
    }
    table
}

pub fn customers_export(customers: &[Customer]) -> ExportTable {
    let mut table = ExportTable::new("Customer_List", &["Customer ID", "Company name", "Address", "State"]);
    for c in customers {
        table.push(vec![
            json!(c.id),
            json!(c.name),
            json!(c.address),
            json!(if c.is_inactive { "Inactive" } else { "Active" }),
        ]);
    }
    table
}

pub fn clients_export(clients: &[Client]) -> ExportTable {
    let mut table = ExportTable::new("Client_List", &["Client code", "Client name", "Address"]);
    for c in clients {
        table.push(vec![json!(c.code), json!(c.name), json!(c.address)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumption::{ConsumptionFilter, consumption_report};
    use crate::seed::demo_data;
    use devtrack_core::types::Invoice;

    #[test]
    fn test_export_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(format_export_date(date), "10.03.2024");
        assert_eq!(parse_export_date("10.03.2024"), Some(date));
        assert_eq!(parse_export_date("2024-03-10"), None);
    }

    #[test]
    fn test_timesheet_round_trips_dates_and_hours() {
        let demo = demo_data();
        let table = timesheet_export(&demo.logs, &demo.tickets, &demo.customers);
        assert_eq!(table.filename, "Timesheet_Export");

        let record = &table.to_records()[0];
        assert_eq!(record["Project"], json!("80001234"));
        assert_eq!(record["Module"], json!("SD"));
        assert_eq!(record["Customer"], json!("Alza.sk s.r.o."));
        let date = parse_export_date(record["Date"].as_str().unwrap()).unwrap();
        assert_eq!(date, demo.logs[0].date);
        assert_eq!(record["Hours"].as_f64(), Some(demo.logs[0].hours));
    }

    #[test]
    fn test_timesheet_manual_reference() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let logs = vec![
            WorkLog::new("C", "U", date, 1.0, "").for_manual("EXT-9", Some("FI".into())),
            WorkLog::new("C", "U", date, 1.0, ""),
        ];
        let table = timesheet_export(&logs, &[], &[]);
        let projects = table.column("Project").unwrap();
        assert_eq!(projects, vec![&json!("EXT-9"), &json!("Manual")]);
        assert_eq!(table.column("Module").unwrap(), vec![&json!("FI"), &json!("N/A")]);
        assert_eq!(table.column("Customer").unwrap()[0], &json!("Unknown"));
    }

    #[test]
    fn test_billing_export() {
        let demo = demo_data();
        let mut logs = demo.logs.clone();
        logs.push(logs[0].clone());
        logs[1].apply_billing(Some(&Invoice {
            number: "INV-100".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }));
        let table = billing_export(&logs, &demo.customers);
        assert_eq!(table.column("Invoice").unwrap(), vec![&json!("Unbilled"), &json!("INV-100")]);
        assert_eq!(table.column("Billing date").unwrap(), vec![&json!("-"), &json!("15.01.2024")]);
    }

    #[test]
    fn test_ticket_and_consumption_exports() {
        let demo = demo_data();
        let tickets = tickets_export(&demo.tickets, &demo.logs, &demo.customers);
        let row = &tickets.to_records()[0];
        assert_eq!(row["Remaining (h)"].as_f64(), Some(76.0));
        assert_eq!(row["Deadline"], json!("30.06.2024"));
        assert_eq!(row["Status"], json!("In progress"));

        let report = consumption_report(&demo.tickets, &demo.logs, &demo.customers, &ConsumptionFilter::default());
        let table = consumption_export(&report);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column("Spent (h)").unwrap(), vec![&json!(4.0)]);
    }

    #[test]
    fn test_master_data_exports() {
        let demo = demo_data();
        let mut customers = demo.customers.clone();
        customers[1].is_inactive = true;
        let table = customers_export(&customers);
        assert_eq!(table.column("State").unwrap(), vec![&json!("Active"), &json!("Inactive")]);

        let table = clients_export(&demo.clients);
        assert_eq!(table.headers, vec!["Client code", "Client name", "Address"]);
        assert_eq!(table.rows[1][0], json!("200"));
    }
}
