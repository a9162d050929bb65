//! Versioned entity snapshots.
//!
//! A snapshot pairs an entity's data with the time it was last written and
//! a checksum over its canonical serialization. Both the local cache and
//! the server hand out snapshots of this shape, so comparing two of them is
//! the first step of every reconciliation pass.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

/// An opaque timestamp as reported by one origin (device or server).
///
/// Comparison across origins is a heuristic, not a linearizable order:
/// 1. Both sides integral: numeric comparison (epoch-based clocks)
/// 2. Both sides dates (RFC 3339 or `YYYY-MM-DD`): chronological
/// 3. Otherwise: lexicographic
///
/// An empty timestamp means "no prior state" and is never newer than anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Creates a timestamp from its string form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The empty timestamp, used for entities that were never written.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Stamps the current wall-clock time (RFC 3339, millisecond precision, UTC).
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    /// Returns the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if no time was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns true if `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &Timestamp) -> bool {
        if self.is_empty() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        self.heuristic_cmp(other) == Ordering::Greater
    }

    fn heuristic_cmp(&self, other: &Timestamp) -> Ordering {
        let (a, b) = (self.0.trim(), other.0.trim());

        if let (Ok(a), Ok(b)) = (a.parse::<i64>(), b.parse::<i64>()) {
            return a.cmp(&b);
        }

        if let (Some(a), Some(b)) = (parse_instant(a), parse_instant(b)) {
            return a.cmp(&b);
        }

        a.cmp(b)
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Timestamp {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A content checksum: lowercase hex SHA-256 over canonical JSON.
///
/// Canonical JSON has object keys sorted at every depth, so identical
/// content always produces an identical checksum regardless of field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Wraps a checksum string received from elsewhere.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The unknown checksum.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Computes the checksum of a serializable value.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Self> {
        let bytes = canonical_json(value)?;
        let digest = Sha256::digest(&bytes);
        Ok(Self(hex::encode(digest)))
    }

    /// Returns the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the checksum is unknown.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if both checksums are known and equal.
    ///
    /// An empty checksum never matches, not even another empty one.
    pub fn matches(&self, other: &Checksum) -> bool {
        !self.is_empty() && !other.is_empty() && self.0 == other.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Checksum {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Serializes a value to JSON with object keys sorted at every depth.
fn canonical_json<T: Serialize + ?Sized>(value: &T) -> ProtocolResult<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    serde_json::to_vec(&canonicalize(value)).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// A versioned copy of an entity's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot<T> {
    /// The entity data.
    pub data: T,
    /// When the data was last written, by its origin's clock.
    pub updated_at: Timestamp,
    /// Checksum of `data`.
    #[serde(default)]
    pub checksum: Checksum,
}

impl<T: Serialize> StateSnapshot<T> {
    /// Creates a snapshot, computing the checksum from `data`.
    pub fn new(data: T, updated_at: impl Into<Timestamp>) -> ProtocolResult<Self> {
        let checksum = Checksum::of(&data)?;
        Ok(Self {
            data,
            updated_at: updated_at.into(),
            checksum,
        })
    }

    /// Returns true if the stored checksum matches the data.
    pub fn verify(&self) -> ProtocolResult<bool> {
        Ok(Checksum::of(&self.data)? == self.checksum)
    }
}

impl<T> StateSnapshot<T> {
    /// Creates a snapshot with a checksum computed elsewhere.
    pub fn from_parts(data: T, updated_at: impl Into<Timestamp>, checksum: Checksum) -> Self {
        Self {
            data,
            updated_at: updated_at.into(),
            checksum,
        }
    }

    /// Returns true if both snapshots carry the same known checksum.
    pub fn matches(&self, other: &StateSnapshot<T>) -> bool {
        self.checksum.matches(&other.checksum)
    }
}
