//! Invoice assignment over batches of work logs.

use chrono::NaiveDate;
use devtrack_core::error::{DevTrackError, Result};
use devtrack_core::types::{Invoice, WorkLog};
use serde::Serialize;
use std::collections::HashSet;

use crate::state::{AppStore, upsert};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    pub billed_hours: f64,
    pub unbilled_hours: f64,
    pub billed_count: usize,
    pub unbilled_count: usize,
}

pub fn billing_summary(logs: &[WorkLog]) -> BillingSummary {
    logs.iter().fold(BillingSummary::default(), |mut acc, log| {
        if log.is_billed() {
            acc.billed_hours += log.hours;
            acc.billed_count += 1;
        } else {
            acc.unbilled_hours += log.hours;
            acc.unbilled_count += 1;
        }
        acc
    })
}

impl AppStore {
    /// Stamp `number`/`date` on every listed log. Unknown ids are skipped.
    /// Returns how many logs were updated.
    pub async fn bill_logs(&self, ids: &[String], number: &str, date: NaiveDate) -> Result<usize> {
        let number = number.trim();
        if number.is_empty() {
            return Err(DevTrackError::InvalidRecord("Invoice number is required".into()));
        }
        let invoice = Invoice {
            number: number.to_string(),
            date,
        };
        let count = self.apply_billing(ids, Some(&invoice)).await?;
        tracing::info!("🧾 Billed {count} log(s) on invoice {number}");
        Ok(count)
    }

    /// Clear invoice number and billing date on every listed log.
    pub async fn cancel_billing(&self, ids: &[String]) -> Result<usize> {
        let count = self.apply_billing(ids, None).await?;
        tracing::info!("🧾 Cancelled billing on {count} log(s)");
        Ok(count)
    }

    async fn apply_billing(&self, ids: &[String], invoice: Option<&Invoice>) -> Result<usize> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let updated: Vec<WorkLog> = {
            let state = self.state.read().await;
            state
                .logs
                .iter()
                .filter(|l| wanted.contains(l.id.as_str()))
                .cloned()
                .map(|mut log| {
                    log.apply_billing(invoice);
                    log
                })
                .collect()
        };
        if updated.is_empty() {
            return Ok(0);
        }

        // The fallback's bulk_put replaces the whole table.
        if self.service.atomic_bulk() {
            self.service.bulk_put_entities(&updated).await?;
        } else {
            for log in &updated {
                self.service.put_entity(log).await?;
            }
        }

        let count = updated.len();
        let mut state = self.state.write().await;
        for log in updated {
            upsert(&mut state.logs, log);
        }
        Ok(count)
    }
}
