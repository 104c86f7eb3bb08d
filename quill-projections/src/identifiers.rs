//! Projection identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

quill_domain::uuid_identifier!(
    /// Identity of a projection
    ProjectionId
);

quill_domain::uuid_identifier!(
    /// Scope a projection reads events from
    ScopeId
);

impl ScopeId {
    /// The default scope
    pub const DEFAULT: ScopeId = ScopeId(Uuid::nil());
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Key of one read model instance within a projection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partition of the stream an event was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_is_nil() {
        assert_eq!(ScopeId::DEFAULT.as_uuid(), Uuid::nil());
        assert_eq!(ScopeId::default(), ScopeId::DEFAULT);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from("Mr. Taco").to_string(), "Mr. Taco");
    }
}
