//! Lenient conversion of stored timestamps.
//!
//! Documents carry timestamps in whatever shape their writer chose: a rich
//! `{seconds, nanoseconds}` object, an RFC 3339 string, or epoch
//! milliseconds. All of them read as `Option<OffsetDateTime>`; anything
//! unreadable reads as `None` instead of failing the document.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub fn from_value(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let total = i128::from(secs) * 1_000_000_000 + i128::from(nanos);
            OffsetDateTime::from_unix_timestamp_nanos(total).ok()
        }
        Value::String(s) => OffsetDateTime::parse(s, &Rfc3339).ok(),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        }
        _ => None,
    }
}

/// The rich object shape written back to the store.
pub fn to_value(at: OffsetDateTime) -> Value {
    serde_json::json!({
        "seconds": at.unix_timestamp(),
        "nanoseconds": at.nanosecond(),
    })
}

pub(crate) fn lenient<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(from_value))
}

pub(crate) fn serialize<S>(at: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    time::serde::rfc3339::option::serialize(at, serializer)
}
