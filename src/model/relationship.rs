//! Relationship status and key.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Kind that matches every kind under a status. Only meaningful in filters.
pub const WILDCARD_KIND: &str = "*";

/// Strength of a relationship. `Past < Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Past,
    Locked,
}

impl RelationshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipStatus::Past => "past",
            RelationshipStatus::Locked => "locked",
        }
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationshipStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "past" => Ok(RelationshipStatus::Past),
            "locked" => Ok(RelationshipStatus::Locked),
            other => Err(Error::InvalidFilter(format!("unknown relationship status '{other}'"))),
        }
    }
}

/// (status, kind) pair under which relationship targets are stored.
///
/// Ordering is by status first, so all `Past` keys sort before `Locked` ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub status: RelationshipStatus,
    pub kind: String,
}

impl RelationshipKey {
    pub fn new(status: RelationshipStatus, kind: impl Into<String>) -> Self {
        Self { status, kind: kind.into() }
    }

    pub fn locked(kind: impl Into<String>) -> Self {
        Self::new(RelationshipStatus::Locked, kind)
    }

    pub fn past(kind: impl Into<String>) -> Self {
        Self::new(RelationshipStatus::Past, kind)
    }

    /// Filter key matching every kind under `status`.
    pub fn wildcard(status: RelationshipStatus) -> Self {
        Self::new(status, WILDCARD_KIND)
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == WILDCARD_KIND
    }

    /// The wildcard key for this key's status.
    pub fn as_wildcard(&self) -> Self {
        Self::wildcard(self.status)
    }
}

impl std::fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.status, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(RelationshipStatus::Past < RelationshipStatus::Locked);
        assert!(RelationshipKey::locked("a") > RelationshipKey::past("z"));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("LOCKED".parse::<RelationshipStatus>().unwrap(), RelationshipStatus::Locked);
        assert_eq!("past".parse::<RelationshipStatus>().unwrap(), RelationshipStatus::Past);
        assert!("future".parse::<RelationshipStatus>().is_err());
    }

    #[test]
    fn test_wildcard() {
        let key = RelationshipKey::locked("rival");
        assert!(!key.is_wildcard());
        assert!(key.as_wildcard().is_wildcard());
        assert_eq!(key.to_string(), "locked_rival");
    }
}
