//! Entity-property update records.
//!
//! A `PropertyUpdate` describes one change to an indexed property of one
//! entity. The mutator resolves it into an `UpdateOp` before touching the
//! batch; records whose values do not fit their mode are rejected there.

use crate::types::{IndexError, IndexValue, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Property set on an entity that did not have it
    Added,
    /// Property value replaced
    Changed,
    /// Property removed from the entity
    Removed,
}

impl UpdateMode {
    /// Get mode name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "added" => Ok(Self::Added),
            "changed" => Ok(Self::Changed),
            "removed" => Ok(Self::Removed),
            other => Err(IndexError::unsupported(format!("unknown update mode '{}'", other))),
        }
    }
}

/// One entity-property change.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    /// Entity whose property changed
    pub entity_id: u64,
    /// Kind of change
    pub mode: UpdateMode,
    /// Value before the change (`Changed`, `Removed`)
    pub value_before: Option<IndexValue>,
    /// Value after the change (`Added`, `Changed`)
    pub value_after: Option<IndexValue>,
}

impl PropertyUpdate {
    /// Property added with `value`.
    pub fn added(entity_id: u64, value: impl Into<IndexValue>) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Added,
            value_before: None,
            value_after: Some(value.into()),
        }
    }

    /// Property changed from `before` to `after`.
    pub fn changed(
        entity_id: u64,
        before: impl Into<IndexValue>,
        after: impl Into<IndexValue>,
    ) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Changed,
            value_before: Some(before.into()),
            value_after: Some(after.into()),
        }
    }

    /// Property with `value` removed.
    pub fn removed(entity_id: u64, value: impl Into<IndexValue>) -> Self {
        Self {
            entity_id,
            mode: UpdateMode::Removed,
            value_before: Some(value.into()),
            value_after: None,
        }
    }

    /// Resolve the record into a typed operation.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::UnsupportedUpdateKind` if the values present do
    /// not match the mode (e.g. `added` without an after-value)
    pub fn resolve(&self) -> Result<UpdateOp<'_>> {
        let entity = self.entity_id;
        match (self.mode, &self.value_before, &self.value_after) {
            (UpdateMode::Added, None, Some(value)) => Ok(UpdateOp::Added { entity, value }),
            (UpdateMode::Changed, Some(before), Some(after)) => {
                Ok(UpdateOp::Changed { entity, before, after })
            }
            (UpdateMode::Removed, Some(value), None) => Ok(UpdateOp::Removed { entity, value }),
            (mode, before, after) => Err(IndexError::unsupported(format!(
                "{} update for entity {} with before={} after={}",
                mode,
                entity,
                before.is_some(),
                after.is_some()
            ))),
        }
    }
}

/// Resolved update, borrowing values from its record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOp<'a> {
    Added {
        entity: u64,
        value: &'a IndexValue,
    },
    Changed {
        entity: u64,
        before: &'a IndexValue,
        after: &'a IndexValue,
    },
    Removed {
        entity: u64,
        value: &'a IndexValue,
    },
}

/// Wire form of an update, as read from JSON lines.
///
/// ```json
/// {"entity_id": 1, "mode": "changed", "before": "x", "after": "y"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub entity_id: u64,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
}

impl TryFrom<UpdateRecord> for PropertyUpdate {
    type Error = IndexError;

    fn try_from(record: UpdateRecord) -> Result<Self> {
        Ok(Self {
            entity_id: record.entity_id,
            mode: record.mode.parse()?,
            value_before: record.before.map(IndexValue::try_from).transpose()?,
            value_after: record.after.map(IndexValue::try_from).transpose()?,
        })
    }
}
