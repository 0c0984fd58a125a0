//! Column layout of the four tables.

use devtrack_core::types::Table;

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Real,
    /// Stored as INTEGER 0/1, surfaced as a JSON bool.
    Bool,
}

impl ColumnKind {
    fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Real => "REAL",
            ColumnKind::Bool => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column { name, kind: ColumnKind::Text }
}

const fn real(name: &'static str) -> Column {
    Column { name, kind: ColumnKind::Real }
}

const CLIENTS: &[Column] = &[text("id"), text("name"), text("code"), text("address")];

const CUSTOMERS: &[Column] = &[
    text("id"),
    text("clientId"),
    text("name"),
    text("address"),
    Column { name: "isInactive", kind: ColumnKind::Bool },
];

const TICKETS: &[Column] = &[
    text("id"),
    text("clientId"),
    text("customerId"),
    text("sapId"),
    text("sapModule"),
    text("title"),
    text("description"),
    text("priority"),
    text("status"),
    real("budget"),
    real("estimation"),
    text("date"),
    text("createdAt"),
    text("startDate"),
];

const WORKLOGS: &[Column] = &[
    text("id"),
    text("clientId"),
    text("customerId"),
    text("ticketId"),
    text("manualTicketId"),
    text("manualModule"),
    text("date"),
    real("hours"),
    text("description"),
    text("invoiceNumber"),
    text("billingDate"),
];

/// Columns of `table`, primary key first.
pub fn columns(table: Table) -> &'static [Column] {
    match table {
        Table::Clients => CLIENTS,
        Table::Customers => CUSTOMERS,
        Table::Tickets => TICKETS,
        Table::Worklogs => WORKLOGS,
    }
}

pub fn column(table: Table, name: &str) -> Option<Column> {
    columns(table).iter().copied().find(|c| c.name == name)
}

/// `CREATE TABLE IF NOT EXISTS` for every table.
pub fn create_statements() -> String {
    let mut sql = String::new();
    for table in Table::ALL {
        let cols: Vec<String> = columns(table)
            .iter()
            .map(|c| {
                if c.name == "id" {
                    "id TEXT PRIMARY KEY".to_string()
                } else {
                    format!("\"{}\" {}", c.name, c.kind.sql_type())
                }
            })
            .collect();
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            table.as_str(),
            cols.join(",\n    ")
        ));
    }
    sql
}
