//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Year-month period token (`"YYYY-MM"`) for a timestamp
///
/// Monthly allowances are scoped to this token; periods are UTC calendar months.
pub fn period_ref(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}
