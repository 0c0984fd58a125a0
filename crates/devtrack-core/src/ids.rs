//! Timestamp-derived entity ids (`TIC-1718000000000`).

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_ISSUED: AtomicI64 = AtomicI64::new(0);

/// Next id for `prefix`. The numeric part is the current unix time in
/// milliseconds, bumped past the previous id so two calls in the same
/// millisecond never collide.
pub fn next_id(prefix: &str) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST_ISSUED.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_ISSUED.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return format!("{prefix}-{candidate}"),
            Err(actual) => prev = actual,
        }
    }
}
