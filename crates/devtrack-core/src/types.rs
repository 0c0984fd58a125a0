//! Entity types shared by every DevTrack layer.
//!
//! Field names on the wire are camelCase and identical across the SQLite
//! columns, the bridge payloads and the local-store JSON blobs.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DevTrackError, Result};
use crate::ids;

/// A plain key-value row as it crosses the storage boundary.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The four persisted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Clients,
    Customers,
    Tickets,
    Worklogs,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Clients, Table::Customers, Table::Tickets, Table::Worklogs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Customers => "customers",
            Table::Tickets => "tickets",
            Table::Worklogs => "worklogs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = DevTrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clients" | "client" => Ok(Table::Clients),
            "customers" | "customer" => Ok(Table::Customers),
            "tickets" | "ticket" => Ok(Table::Tickets),
            "worklogs" | "worklog" | "logs" => Ok(Table::Worklogs),
            other => Err(DevTrackError::UnknownTable(other.to_string())),
        }
    }
}

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    #[serde(alias = "Nízka")]
    Low,
    #[default]
    #[serde(alias = "Stredná")]
    Medium,
    #[serde(alias = "Vysoká")]
    High,
    #[serde(alias = "Urgentná")]
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        };
        f.write_str(label)
    }
}

/// Ticket workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    #[serde(alias = "Otvorené")]
    Open,
    #[serde(rename = "In progress", alias = "V riešení")]
    InProgress,
    #[serde(alias = "Testovanie")]
    Testing,
    #[serde(alias = "Hotovo")]
    Done,
    #[serde(alias = "Zrušené")]
    Cancelled,
}

impl Status {
    /// Done and Cancelled tickets are hidden from active lists by default.
    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Done | Status::Cancelled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Open => "Open",
            Status::InProgress => "In progress",
            Status::Testing => "Testing",
            Status::Done => "Done",
            Status::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// Top-level tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub address: String,
}

impl Client {
    pub fn new(name: impl Into<String>, code: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: ids::next_id(Self::ID_PREFIX),
            name: name.into(),
            code: code.into(),
            address: address.into(),
        }
    }
}

/// Billable counterparty under a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub is_inactive: bool,
}

impl Customer {
    pub fn new(client_id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: ids::next_id(Self::ID_PREFIX),
            client_id: client_id.into(),
            name: name.into(),
            address: address.into(),
            is_inactive: false,
        }
    }
}

/// Tracked project under a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub customer_id: String,
    /// Reference in the external ERP system.
    #[serde(rename = "sapId", default)]
    pub external_ref: String,
    #[serde(rename = "sapModule", default)]
    pub module: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    /// Hour budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_date")]
    pub start_date: Option<NaiveDate>,
    /// Deadline.
    #[serde(rename = "date", default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::date")]
    pub created_at: NaiveDate,
}

impl Ticket {
    pub fn new(client_id: impl Into<String>, customer_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: ids::next_id(Self::ID_PREFIX),
            client_id: client_id.into(),
            customer_id: customer_id.into(),
            external_ref: String::new(),
            module: String::new(),
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            status: Status::default(),
            budget: None,
            estimation: None,
            start_date: None,
            due_date: None,
            created_at: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_budget(mut self, hours: f64) -> Self {
        self.budget = Some(hours);
        self
    }
}

/// What a work log is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketRef<'a> {
    Linked(&'a str),
    Manual {
        reference: &'a str,
        module: Option<&'a str>,
    },
    Unassigned,
}

/// Invoice number and billing date, always applied together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub date: NaiveDate,
}

/// Dated record of hours spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLog {
    pub id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub manual_ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub manual_module: Option<String>,
    #[serde(deserialize_with = "lenient::date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub hours: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_date")]
    pub billing_date: Option<NaiveDate>,
}

impl WorkLog {
    pub fn new(
        client_id: impl Into<String>,
        customer_id: impl Into<String>,
        date: NaiveDate,
        hours: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ids::next_id(Self::ID_PREFIX),
            client_id: client_id.into(),
            customer_id: customer_id.into(),
            ticket_id: None,
            manual_ticket_id: None,
            manual_module: None,
            date,
            hours,
            description: description.into(),
            invoice_number: None,
            billing_date: None,
        }
    }

    /// Book the log against a real ticket, dropping any manual reference.
    pub fn for_ticket(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self.manual_ticket_id = None;
        self.manual_module = None;
        self
    }

    /// Book the log against a free-text reference.
    pub fn for_manual(mut self, reference: impl Into<String>, module: Option<String>) -> Self {
        self.ticket_id = None;
        self.manual_ticket_id = Some(reference.into());
        self.manual_module = module;
        self
    }

    /// A linked ticket wins over a manual reference.
    pub fn ticket_ref(&self) -> TicketRef<'_> {
        if let Some(id) = self.ticket_id.as_deref() {
            return TicketRef::Linked(id);
        }
        match self.manual_ticket_id.as_deref() {
            Some(reference) => TicketRef::Manual {
                reference,
                module: self.manual_module.as_deref(),
            },
            None => TicketRef::Unassigned,
        }
    }

    pub fn is_billed(&self) -> bool {
        self.invoice_number.is_some()
    }

    /// Set or clear both billing fields at once.
    pub fn apply_billing(&mut self, invoice: Option<&Invoice>) {
        match invoice {
            Some(inv) => {
                self.invoice_number = Some(inv.number.clone());
                self.billing_date = Some(inv.date);
            }
            None => {
                self.invoice_number = None;
                self.billing_date = None;
            }
        }
    }
}

/// A typed row of one of the four tables.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;

    /// Owning tenant; a client owns itself.
    fn client_id(&self) -> &str;

    fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(DevTrackError::InvalidRecord(format!(
                "{} row serialized to non-object: {other}",
                Self::TABLE
            ))),
        }
    }

    fn from_record(record: Record) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(record))?)
    }
}

impl Entity for Client {
    const TABLE: Table = Table::Clients;
    const ID_PREFIX: &'static str = "CLI";
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.id }
}

impl Entity for Customer {
    const TABLE: Table = Table::Customers;
    const ID_PREFIX: &'static str = "CUST";
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.client_id }
}

impl Entity for Ticket {
    const TABLE: Table = Table::Tickets;
    const ID_PREFIX: &'static str = "TIC";
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.client_id }
}

impl Entity for WorkLog {
    const TABLE: Table = Table::Worklogs;
    const ID_PREFIX: &'static str = "LOG";
    fn id(&self) -> &str { &self.id }
    fn client_id(&self) -> &str { &self.client_id }
}

/// Tolerant decoders for rows written by older builds (0/1 flags, empty
/// strings for missing references, timestamps where dates are expected).
mod lenient {
    use chrono::NaiveDate;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Option::<BoolLike>::deserialize(d)? {
            Some(BoolLike::Bool(b)) => b,
            Some(BoolLike::Int(i)) => i != 0,
            Some(BoolLike::Float(f)) => f != 0.0,
            Some(BoolLike::Text(s)) => matches!(s.trim(), "true" | "1"),
            None => false,
        })
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
    }

    fn parse(s: &str) -> Option<NaiveDate> {
        let head = s.trim().get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(d)?;
        parse(&s).ok_or_else(|| D::Error::custom(format!("invalid date: {s:?}")))
    }

    pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(s) if !s.trim().is_empty() => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {s:?}"))),
            _ => Ok(None),
        }
    }
}
