//! Status-tagged source results
//!
//! Every source adapter hands the core a [`TaggedResult`]: a status string and
//! an untyped JSON payload. The status signals fetch health without using
//! errors. Only `"success"` means the payload should be scored; any other
//! status (including ones this crate has never heard of) is treated the same.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::AggregateError;

/// The only status whose payload is scored
pub const STATUS_SUCCESS: &str = "success";

/// Status recorded when an adapter gave none
pub const STATUS_UNKNOWN: &str = "unknown";

/// Well-known statuses emitted by the bundled adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Payload fetched and usable
    Success,
    /// Fetch failed; payload is empty or partial
    Failure,
    /// Adapter could not tell
    Unknown,
    /// Built-in substitute data was returned instead of live data
    Fallback,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Success => STATUS_SUCCESS,
            SourceStatus::Failure => "failure",
            SourceStatus::Unknown => STATUS_UNKNOWN,
            SourceStatus::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_status() -> String {
    STATUS_UNKNOWN.to_string()
}

/// A domain payload qualified by its fetch status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedResult {
    /// Free-form status; only `"success"` is scored
    #[serde(default = "default_status")]
    pub status: String,

    /// Domain payload, shape depends on the domain.
    ///
    /// `None` when the key is absent; an explicit `null` is `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

/// Keep an explicit `null` distinct from a missing key
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

static ABSENT: Value = Value::Null;

impl TaggedResult {
    /// Tag a payload with an arbitrary status
    pub fn new(status: impl Into<String>, data: Value) -> Self {
        Self {
            status: status.into(),
            data: Some(data),
        }
    }

    /// Tag a status with no payload at all
    pub fn without_data(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            data: None,
        }
    }

    pub fn success(data: Value) -> Self {
        Self::new(STATUS_SUCCESS, data)
    }

    /// A failed fetch with no payload
    pub fn failure() -> Self {
        Self::without_data(SourceStatus::Failure.as_str())
    }

    pub fn with_status(status: SourceStatus, data: Value) -> Self {
        Self::new(status.as_str(), data)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// The payload, reading a missing one as `null`
    pub fn payload(&self) -> &Value {
        self.data.as_ref().unwrap_or(&ABSENT)
    }
}

impl Default for TaggedResult {
    fn default() -> Self {
        Self::without_data(STATUS_UNKNOWN)
    }
}

/// The four scored domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Military,
    Economic,
    News,
    Stock,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Military, Domain::Economic, Domain::News, Domain::Stock];

    /// Key of this domain in a raw bundle
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Military => "military",
            Domain::Economic => "economic",
            Domain::News => "news",
            Domain::Stock => "stock",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One tagged result per domain, as produced by a collection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBundle {
    pub military: TaggedResult,
    pub economic: TaggedResult,
    pub news: TaggedResult,
    pub stock: TaggedResult,
}

impl DataBundle {
    /// Parse a raw JSON bundle.
    ///
    /// Every domain key must be present and hold an object; extra keys such
    /// as a collection timestamp are ignored.
    pub fn from_value(raw: &Value) -> Result<Self, AggregateError> {
        let object = raw.as_object().ok_or(AggregateError::MalformedBundle(
            "bundle is not a JSON object".to_string(),
        ))?;

        let parse = |domain: Domain| -> Result<TaggedResult, AggregateError> {
            let entry = object
                .get(domain.key())
                .ok_or(AggregateError::MissingDomain(domain))?;
            serde_json::from_value(entry.clone()).map_err(|e| AggregateError::MalformedDomain {
                domain,
                reason: e.to_string(),
            })
        };

        Ok(Self {
            military: parse(Domain::Military)?,
            economic: parse(Domain::Economic)?,
            news: parse(Domain::News)?,
            stock: parse(Domain::Stock)?,
        })
    }

    pub fn get(&self, domain: Domain) -> &TaggedResult {
        match domain {
            Domain::Military => &self.military,
            Domain::Economic => &self.economic,
            Domain::News => &self.news,
            Domain::Stock => &self.stock,
        }
    }
}
