//! Listing data structure.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One real-estate offer as exchanged between a source, the store and the filter.
///
/// Only `id` is identity. Site-specific fields such as `title`, `href` or
/// `thumbnail` travel in `extra` and are written back at the top level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    /// Stable identifier scoped to the source site
    pub id: String,

    /// Site-specific detail payload, `null` until fetched
    #[serde(default)]
    pub details: Value,

    /// First observation
    #[serde(default, with = "timestamp::option")]
    pub first_seen: Option<NaiveDateTime>,

    /// Most recent observation
    #[serde(default, with = "timestamp::option")]
    pub last_seen: Option<NaiveDateTime>,

    /// Remaining top-level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Listing {
    /// Create a bare listing skeleton with no details and no observations.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: Value::Null,
            first_seen: None,
            last_seen: None,
            extra: Map::new(),
        }
    }

    /// Builder-style setter for the details payload.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Builder-style setter for an extra top-level field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Top-level string field such as `title` or `href`.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Whether details have been fetched for this listing.
    pub fn has_details(&self) -> bool {
        !self.details.is_null()
    }
}

/// Timestamp format of the persisted store: local time, second precision, no zone.
pub mod timestamp {
    use chrono::{NaiveDateTime, Timelike};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Format a timestamp the way the store persists it.
    pub fn format(ts: &NaiveDateTime) -> String {
        ts.format(FORMAT).to_string()
    }

    /// Parse a persisted timestamp.
    pub fn parse(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, FORMAT)
    }

    /// Current local time truncated to the persisted precision.
    pub fn now() -> NaiveDateTime {
        let now = chrono::Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }

    /// Serde adapter for `Option<NaiveDateTime>` fields (`null` when unset).
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(ts) => serializer.serialize_str(&super::format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) => super::parse(&s).map(Some).map_err(D::Error::custom),
                None => Ok(None),
            }
        }
    }
}
