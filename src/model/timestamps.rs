//! Timestamp helpers shared by the model and the renderers.

use chrono::{DateTime, Utc};

/// Human readable date and time, used inside conversation documents.
pub fn format_datetime(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Date only, used in index listings.
pub fn format_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// RFC 3339 timestamps that degrade to `None` instead of failing the whole
/// document when the value is missing, null or unparsable.
pub mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}
