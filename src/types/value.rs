//! Indexed property values.
//!
//! An `IndexValue` is the scalar a caller indexes entities under. The index
//! never compares values semantically: two values name the same posting list
//! only when their encoded bytes are identical, so `Int(1)` and `Float(1.0)`
//! are distinct keys and floats compare by bit pattern.

use crate::types::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar property value supplied with each update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// 64-bit float (keyed by bit pattern)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl IndexValue {
    /// Short type name, used in log fields and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for IndexValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for IndexValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for IndexValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for IndexValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for IndexValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Convert a JSON scalar into an index value.
///
/// Integers that fit `i64` become `Int` and fractional numbers become
/// `Float`. Integers above `i64::MAX` are rejected rather than rounded into a
/// float key. Arrays, objects and `null` are not indexable.
impl TryFrom<serde_json::Value> for IndexValue {
    type Error = IndexError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None if n.is_u64() => Err(IndexError::unsupported(format!(
                    "integer {} does not fit a signed 64-bit value",
                    n
                ))),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| IndexError::unsupported(format!("number out of range: {}", n))),
            },
            other => Err(IndexError::unsupported(format!(
                "value is not an indexable scalar: {}",
                other
            ))),
        }
    }
}
