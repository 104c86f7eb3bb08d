//! Key selectors
//!
//! A key selector tells the runtime which read model instance an event
//! belongs to. Keys are computed by the runtime; the client only sends the
//! selector with the registration.

use serde::{Deserialize, Serialize};

use crate::identifiers::Key;

/// How the key of a read model instance is chosen for an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// Key by the event source id
    EventSourceId,
    /// Key by the partition of the stream
    PartitionId,
    /// Key by a property of the event content
    Property(String),
    /// Always the same key
    Static(Key),
    /// Key by when the event occurred, formatted with a chrono format string
    EventOccurred(String),
}

/// Key selector kind on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireKeySelectorType {
    EventSourceId,
    PartitionId,
    Property,
    Static,
    EventOccurred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireKeySelector {
    pub selector_type: WireKeySelectorType,
    pub expression: String,
    pub static_key: String,
    pub occurred_format: String,
}

impl From<&KeySelector> for WireKeySelector {
    fn from(selector: &KeySelector) -> Self {
        let (selector_type, expression, static_key, occurred_format) = match selector {
            KeySelector::EventSourceId => (WireKeySelectorType::EventSourceId, "", "", ""),
            KeySelector::PartitionId => (WireKeySelectorType::PartitionId, "", "", ""),
            KeySelector::Property(property) => {
                (WireKeySelectorType::Property, property.as_str(), "", "")
            }
            KeySelector::Static(key) => (WireKeySelectorType::Static, "", key.as_str(), ""),
            KeySelector::EventOccurred(format) => {
                (WireKeySelectorType::EventOccurred, "", "", format.as_str())
            }
        };

        Self {
            selector_type,
            expression: expression.to_string(),
            static_key: static_key.to_string(),
            occurred_format: occurred_format.to_string(),
        }
    }
}
