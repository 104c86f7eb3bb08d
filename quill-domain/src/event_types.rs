//! Event type registry
//!
//! Maps Rust types to [`EventType`]s for send-time resolution, and event
//! types back to decoders for receive-time decoding. The registry is built
//! once during application setup and shared read-only afterwards.

use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::content::{EventContent, TypedContent};
use crate::error::EventsError;
use crate::identifiers::EventType;

type Decoder = Arc<dyn Fn(&serde_json::Value) -> serde_json::Result<TypedContent> + Send + Sync>;

/// The Rust type of some event content, remembered until send time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentType {
    id: TypeId,
    name: &'static str,
}

impl ContentType {
    /// Content type of `T`
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }
}

struct Registration {
    type_name: &'static str,
    decoder: Decoder,
}

/// Registry of known event types
#[derive(Default, Clone)]
pub struct EventTypes {
    by_content_type: HashMap<TypeId, EventType>,
    registrations: HashMap<EventType, Arc<Registration>>,
}

impl EventTypes {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `T` with an event type.
    ///
    /// # Errors
    /// Returns `EventsError::EventTypeAlreadyRegistered` if either `T` or the
    /// event type is already in the registry.
    pub fn register<T>(&mut self, event_type: EventType) -> Result<(), EventsError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let content_type = ContentType::of::<T>();

        if self.by_content_type.contains_key(&content_type.id) {
            return Err(EventsError::EventTypeAlreadyRegistered(content_type.name.to_string()));
        }
        if self.registrations.contains_key(&event_type) {
            return Err(EventsError::EventTypeAlreadyRegistered(event_type.to_string()));
        }

        let decoder: Decoder = Arc::new(|json: &serde_json::Value| {
            T::deserialize(json).map(|value| Arc::new(value) as TypedContent)
        });

        self.by_content_type.insert(content_type.id, event_type.clone());
        self.registrations.insert(
            event_type,
            Arc::new(Registration {
                type_name: content_type.name,
                decoder,
            }),
        );
        Ok(())
    }

    /// Resolve the event type registered for a content type.
    ///
    /// # Errors
    /// Returns `EventsError::UnknownEventType` if nothing is registered.
    pub fn resolve(&self, content_type: &ContentType) -> Result<EventType, EventsError> {
        self.by_content_type
            .get(&content_type.id)
            .cloned()
            .ok_or_else(|| EventsError::UnknownEventType(content_type.name.to_string()))
    }

    /// Event type registered for `T`, if any
    pub fn event_type_for<T: 'static>(&self) -> Option<&EventType> {
        self.by_content_type.get(&TypeId::of::<T>())
    }

    /// Whether an event type has a registered Rust type
    pub fn is_registered(&self, event_type: &EventType) -> bool {
        self.registrations.contains_key(event_type)
    }

    /// Rust type name registered for an event type
    pub fn type_name_of(&self, event_type: &EventType) -> Option<&'static str> {
        self.registrations.get(event_type).map(|r| r.type_name)
    }

    /// Decode JSON content received for an event type.
    ///
    /// Unregistered event types stay plain JSON.
    ///
    /// # Errors
    /// Returns the deserialization error if a registered decoder rejects the JSON.
    pub fn decode(
        &self,
        event_type: &EventType,
        json: serde_json::Value,
    ) -> serde_json::Result<EventContent> {
        match self.registrations.get(event_type) {
            Some(registration) => {
                let typed = (registration.decoder)(&json)?;
                Ok(EventContent::with_typed(json, typed))
            }
            None => Ok(EventContent::from_json(json)),
        }
    }

    /// All registered event types
    pub fn event_types(&self) -> impl Iterator<Item = &EventType> {
        self.registrations.keys()
    }

    /// Number of registered event types
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl fmt::Debug for EventTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.registrations.iter().map(|(event_type, r)| (event_type, r.type_name)))
            .finish()
    }
}
