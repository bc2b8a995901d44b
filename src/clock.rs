use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use once_cell::sync::Lazy;

// All persisted timestamps use portal civil time (+05:30) regardless of
// the host zone, so lexicographic order on stamps is chronological order.
static PORTAL_OFFSET: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("valid offset"));

pub fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&*PORTAL_OFFSET)
}

pub fn stamp(at: DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn now_stamp() -> String {
    stamp(now())
}

pub fn epoch_seconds() -> i64 {
    Utc::now().timestamp()
}
