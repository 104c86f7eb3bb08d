//! Identifiers
//!
//! Opaque 128-bit identifiers compared by value, plus the [`EventType`]
//! that names one schema generation of an event.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// The generated type is `Copy`, hashable, serializes as a plain UUID string
/// and converts to and from [`Uuid`]. Callers must depend on `serde` and
/// `uuid`.
#[macro_export]
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Generate a new random identifier
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(value: ::uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Identity of the stream events are appended to
    EventSourceId
);

uuid_identifier!(
    /// Identity of the aggregate root that applies events to an event source
    AggregateRootId
);

uuid_identifier!(
    /// Identity part of an [`EventType`]
    EventTypeId
);

uuid_identifier!(
    /// Tenant an execution context runs on behalf of
    TenantId
);

uuid_identifier!(
    /// Microservice an execution context originates from
    MicroserviceId
);

// =============================================================================
// Generation
// =============================================================================

/// Schema generation of an event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u32);

impl Generation {
    /// First generation of any event type
    pub const FIRST: Generation = Generation(1);

    /// Create a generation
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// EventType
// =============================================================================

/// One schema generation of an event.
///
/// Equality and hashing only consider the id and generation; the alias is a
/// human-readable label and never affects identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventType {
    id: EventTypeId,
    generation: Generation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
}

impl EventType {
    /// Create an event type with the given generation
    pub fn new(id: EventTypeId, generation: Generation) -> Self {
        Self {
            id,
            generation,
            alias: None,
        }
    }

    /// Set a human-readable alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Get the event type id
    pub fn id(&self) -> EventTypeId {
        self.id
    }

    /// Get the generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the alias, if any
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl From<EventTypeId> for EventType {
    fn from(id: EventTypeId) -> Self {
        Self::new(id, Generation::FIRST)
    }
}

impl From<Uuid> for EventType {
    fn from(id: Uuid) -> Self {
        Self::new(EventTypeId::from(id), Generation::FIRST)
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.generation == other.generation
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.generation.hash(state);
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} [{}@{}]", alias, self.id, self.generation),
            None => write!(f, "{}@{}", self.id, self.generation),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifier_equality_by_value() {
        let uuid = Uuid::now_v7();
        assert_eq!(EventSourceId::from(uuid), EventSourceId::from(uuid));
        assert_ne!(EventSourceId::from(uuid), EventSourceId::generate());
    }

    #[test]
    fn test_identifier_parse_and_display() {
        let id: AggregateRootId = "c4d4ad4f-1f4a-4a6e-9b4e-3c0ef4c2f8a1".parse().unwrap();
        assert_eq!(id.to_string(), "c4d4ad4f-1f4a-4a6e-9b4e-3c0ef4c2f8a1");
        assert!("not-a-uuid".parse::<AggregateRootId>().is_err());
    }

    #[test]
    fn test_identifier_serializes_as_plain_uuid() {
        let uuid = Uuid::nil();
        let json = serde_json::to_string(&EventSourceId::from(uuid)).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_event_type_ignores_alias_for_identity() {
        let id = EventTypeId::generate();
        let plain = EventType::new(id, Generation::FIRST);
        let aliased = EventType::new(id, Generation::FIRST).with_alias("DishPrepared");

        assert_eq!(plain, aliased);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(set.contains(&aliased));
    }

    #[test]
    fn test_event_type_generation_matters() {
        let id = EventTypeId::generate();
        assert_ne!(EventType::new(id, Generation::new(1)), EventType::new(id, Generation::new(2)));
    }

    #[test]
    fn test_event_type_from_id_uses_first_generation() {
        let event_type = EventType::from(EventTypeId::generate());
        assert_eq!(event_type.generation(), Generation::FIRST);
        assert!(event_type.alias().is_none());
    }
}
