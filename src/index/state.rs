//! Index lifecycle state.

use crate::types::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an index.
///
/// `Populating -> Online` happens only on a successful completion signal.
/// There is no failed state: a failed population stays `Populating` and the
/// host decides whether to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    #[default]
    Populating,
    Online,
}

impl IndexState {
    /// Byte persisted in the metadata column family.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Populating => 0,
            Self::Online => 1,
        }
    }

    /// Decode a persisted state.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::CorruptEncoding` for anything but a single known byte
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [0] => Ok(Self::Populating),
            [1] => Ok(Self::Online),
            other => Err(IndexError::corrupt(format!("index state {:?}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Populating => "populating",
            Self::Online => "online",
        }
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bytes() {
        for state in [IndexState::Populating, IndexState::Online] {
            assert_eq!(IndexState::decode(&[state.as_byte()]).unwrap(), state);
        }
        assert!(IndexState::decode(&[]).is_err());
        assert!(IndexState::decode(&[7]).is_err());
        assert!(IndexState::decode(&[1, 1]).is_err());
    }

    #[test]
    fn test_default_is_populating() {
        assert_eq!(IndexState::default(), IndexState::Populating);
    }
}
