//! Work-log queries and reporting periods.

use chrono::{Datelike, Duration, Months, NaiveDate};
use devtrack_core::types::{Customer, Ticket, WorkLog};
use std::str::FromStr;

use devtrack_core::error::DevTrackError;

/// Criteria for selecting work logs. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub ticket_id: Option<String>,
    pub unbilled_only: bool,
    /// Case-insensitive substring over description, references and names.
    pub search: Option<String>,
}

impl LogQuery {
    pub fn in_period(mut self, (from, to): (NaiveDate, NaiveDate)) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    fn matches(&self, log: &WorkLog, tickets: &[Ticket], customers: &[Customer]) -> bool {
        if self.from.is_some_and(|from| log.date < from) || self.to.is_some_and(|to| log.date > to) {
            return false;
        }
        if self.customer_id.as_deref().is_some_and(|c| log.customer_id != c) {
            return false;
        }
        if self.ticket_id.is_some() && log.ticket_id != self.ticket_id {
            return false;
        }
        if self.unbilled_only && log.is_billed() {
            return false;
        }

        let needle = match self.search.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => return true,
        };
        let ticket = log
            .ticket_id
            .as_deref()
            .and_then(|id| tickets.iter().find(|t| t.id == id));
        let customer = customers.iter().find(|c| c.id == log.customer_id);
        let haystack = [
            Some(log.description.as_str()),
            log.manual_ticket_id.as_deref(),
            log.invoice_number.as_deref(),
            ticket.map(|t| t.external_ref.as_str()),
            ticket.map(|t| t.title.as_str()),
            customer.map(|c| c.name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
        haystack.contains(&needle)
    }
}

/// Matching logs sorted by date ascending.
pub fn query_logs(
    logs: &[WorkLog],
    tickets: &[Ticket],
    customers: &[Customer],
    query: &LogQuery,
) -> Vec<WorkLog> {
    let mut result: Vec<WorkLog> = logs
        .iter()
        .filter(|l| query.matches(l, tickets, customers))
        .cloned()
        .collect();
    result.sort_by_key(|l| l.date);
    result
}

pub fn total_hours(logs: &[WorkLog]) -> f64 {
    logs.iter().map(|l| l.hours).sum()
}

/// Calendar period used by the report date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    /// Monday to Sunday.
    Week,
    Month,
    Year,
}

impl Period {
    /// First and last day of the period containing `anchor`.
    pub fn range(&self, anchor: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Day => (anchor, anchor),
            Period::Week => {
                let start = anchor - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            Period::Month => {
                let start = anchor.with_day(1).unwrap_or(anchor);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(anchor);
                (start, end)
            }
            Period::Year => {
                let start = NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor);
                let end = NaiveDate::from_ymd_opt(anchor.year(), 12, 31).unwrap_or(anchor);
                (start, end)
            }
        }
    }

    /// The same period `steps` periods before (negative) or after (positive).
    pub fn shift(&self, anchor: NaiveDate, steps: i32) -> (NaiveDate, NaiveDate) {
        let moved = match self {
            Period::Day => anchor + Duration::days(i64::from(steps)),
            Period::Week => anchor + Duration::weeks(i64::from(steps)),
            Period::Month => shift_months(anchor.with_day(1).unwrap_or(anchor), steps),
            Period::Year => shift_months(anchor.with_day(1).unwrap_or(anchor), steps * 12),
        };
        self.range(moved)
    }
}

fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let delta = Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
        date.checked_add_months(delta)
    } else {
        date.checked_sub_months(delta)
    };
    shifted.unwrap_or(date)
}

impl FromStr for Period {
    type Err = DevTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(DevTrackError::InvalidRecord(format!("Unknown period: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtrack_core::types::Invoice;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> (Vec<WorkLog>, Vec<Ticket>, Vec<Customer>) {
        let mut ticket = Ticket::new("CLI-1", "CUST-1", "Payment gateway");
        ticket.id = "TIC-1".into();
        ticket.external_ref = "80001234".into();
        let mut customer = Customer::new("CLI-1", "Globex", "");
        customer.id = "CUST-1".into();

        let mut billed = WorkLog::new("CLI-1", "CUST-1", ymd(2024, 2, 1), 2.0, "deploy").for_ticket("TIC-1");
        billed.apply_billing(Some(&Invoice { number: "INV-7".into(), date: ymd(2024, 2, 28) }));
        let logs = vec![
            billed,
            WorkLog::new("CLI-1", "CUST-1", ymd(2024, 1, 15), 4.0, "API review").for_ticket("TIC-1"),
            WorkLog::new("CLI-1", "CUST-2", ymd(2024, 1, 20), 1.5, "call").for_manual("EXT-9", Some("FI".into())),
        ];
        (logs, vec![ticket], vec![customer])
    }

    #[test]
    fn test_query_sorts_by_date() {
        let (logs, tickets, customers) = fixture();
        let result = query_logs(&logs, &tickets, &customers, &LogQuery::default());
        let dates: Vec<NaiveDate> = result.iter().map(|l| l.date).collect();
        assert_eq!(dates, vec![ymd(2024, 1, 15), ymd(2024, 1, 20), ymd(2024, 2, 1)]);
        assert_eq!(total_hours(&result), 7.5);
    }

    #[test]
    fn test_query_filters() {
        let (logs, tickets, customers) = fixture();
        let january = LogQuery::default().in_period(Period::Month.range(ymd(2024, 1, 10)));
        assert_eq!(query_logs(&logs, &tickets, &customers, &january).len(), 2);

        let unbilled = LogQuery { unbilled_only: true, ..Default::default() };
        assert_eq!(query_logs(&logs, &tickets, &customers, &unbilled).len(), 2);

        let by_ticket = LogQuery { ticket_id: Some("TIC-1".into()), ..Default::default() };
        assert_eq!(query_logs(&logs, &tickets, &customers, &by_ticket).len(), 2);

        let by_customer = LogQuery { customer_id: Some("CUST-2".into()), ..Default::default() };
        assert_eq!(query_logs(&logs, &tickets, &customers, &by_customer)[0].hours, 1.5);
    }

    #[test]
    fn test_search_covers_related_names() {
        let (logs, tickets, customers) = fixture();
        let search = |s: &str| {
            let q = LogQuery { search: Some(s.into()), ..Default::default() };
            query_logs(&logs, &tickets, &customers, &q).len()
        };
        assert_eq!(search("80001234"), 2);
        assert_eq!(search("GLOBEX"), 2);
        assert_eq!(search("ext-9"), 1);
        assert_eq!(search("inv-7"), 1);
        assert_eq!(search("   "), 3);
        assert_eq!(search("nothing"), 0);
    }

    #[test]
    fn test_period_ranges() {
        let d = ymd(2024, 2, 14); // Wednesday
        assert_eq!(Period::Week.range(d), (ymd(2024, 2, 12), ymd(2024, 2, 18)));
        assert_eq!(Period::Month.range(d), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(Period::Year.range(d), (ymd(2024, 1, 1), ymd(2024, 12, 31)));
        assert_eq!(Period::Month.shift(ymd(2024, 1, 31), 1), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
        assert_eq!(Period::Day.shift(d, -1), (ymd(2024, 2, 13), ymd(2024, 2, 13)));
        assert_eq!(Period::Year.shift(d, -1).0, ymd(2023, 1, 1));
        assert_eq!("week".parse::<Period>().unwrap(), Period::Week);
    }
}
