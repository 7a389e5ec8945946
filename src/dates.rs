use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Fixed-width UTC timestamp so stored values sort lexicographically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (truncated to its UTC date).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(t)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
