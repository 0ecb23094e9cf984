use crate::models::common::{IsoDate, Timestamp};
use chrono::DateTime;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Returns the current time as nanoseconds since epoch.
pub fn get_current_time_ns() -> Timestamp {
    #[cfg(target_family = "wasm")]
    {
        ic_cdk::api::time()
    }
    #[cfg(not(target_family = "wasm"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64)
    }
}

/// Calendar date (UTC) of a nanosecond timestamp, as `YYYY-MM-DD`.
pub fn iso_date(timestamp_ns: Timestamp) -> IsoDate {
    let secs = (timestamp_ns / NANOS_PER_SEC) as i64;
    let nanos = (timestamp_ns % NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

/// Today's date as `YYYY-MM-DD`.
pub fn today() -> IsoDate {
    iso_date(get_current_time_ns())
}

/// True when `value` is a real calendar date written as `YYYY-MM-DD`.
pub fn is_iso_date(value: &str) -> bool {
    value.len() == 10 && chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
