//! Event content
//!
//! Content always travels as JSON. When the event type registry knows a
//! Rust type for an event type, the decoded value rides along with the JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::EventsError;

/// Decoded value produced by a registered event type.
pub type TypedContent = Arc<dyn Any + Send + Sync>;

/// Content of an event
#[derive(Clone)]
pub struct EventContent {
    json: serde_json::Value,
    typed: Option<TypedContent>,
}

impl EventContent {
    /// Content with no typed representation
    pub fn from_json(json: serde_json::Value) -> Self {
        Self { json, typed: None }
    }

    /// Content with a decoded typed representation
    pub fn with_typed(json: serde_json::Value, typed: TypedContent) -> Self {
        Self {
            json,
            typed: Some(typed),
        }
    }

    /// Serialize any value into content
    pub fn serialize<T: Serialize>(value: &T) -> Result<Self, EventsError> {
        serde_json::to_value(value)
            .map(Self::from_json)
            .map_err(|e| EventsError::EventContentCouldNotBeSerialized(e.to_string()))
    }

    /// JSON representation
    pub fn json(&self) -> &serde_json::Value {
        &self.json
    }

    /// Consume into the JSON representation
    pub fn into_json(self) -> serde_json::Value {
        self.json
    }

    /// Whether the content is anything other than JSON `null`
    pub fn is_defined(&self) -> bool {
        !self.json.is_null()
    }

    /// Whether a registered decoder produced a typed value
    pub fn is_typed(&self) -> bool {
        self.typed.is_some()
    }

    /// Borrow the typed value if it was decoded as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.typed.as_ref().and_then(|typed| typed.downcast_ref::<T>())
    }

    /// Deserialize the JSON into `T`, regardless of registration
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.json)
    }
}

impl From<serde_json::Value> for EventContent {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

impl PartialEq for EventContent {
    fn eq(&self, other: &Self) -> bool {
        self.json == other.json
    }
}

impl fmt::Debug for EventContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContent")
            .field("json", &self.json)
            .field("typed", &self.typed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DishPrepared {
        dish: String,
        chef: String,
    }

    #[test]
    fn test_null_is_not_defined() {
        assert!(!EventContent::from_json(serde_json::Value::Null).is_defined());
        assert!(EventContent::from_json(json!({})).is_defined());
    }

    #[test]
    fn test_downcast_typed_content() {
        let dish = DishPrepared {
            dish: "Bean Blaster Taco".to_string(),
            chef: "Mr. Taco".to_string(),
        };
        let json = serde_json::to_value(&dish).unwrap();
        let content = EventContent::with_typed(json, Arc::new(dish));

        let typed = content.downcast_ref::<DishPrepared>().unwrap();
        assert_eq!(typed.chef, "Mr. Taco");
        assert!(content.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_deserialize_plain_json() {
        let content = EventContent::from(json!({"dish": "Avocado Artillery", "chef": "Ana"}));
        let dish: DishPrepared = content.deserialize().unwrap();
        assert_eq!(dish.dish, "Avocado Artillery");
        assert!(!content.is_typed());
    }

    #[test]
    fn test_equality_ignores_typed_part() {
        let json = json!({"dish": "x", "chef": "y"});
        let plain = EventContent::from_json(json.clone());
        let typed = EventContent::with_typed(json, Arc::new(1_u8));
        assert_eq!(plain, typed);
    }
}
