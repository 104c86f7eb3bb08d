//! Uncommitted events
//!
//! Events built by application code before they are sent. Content is
//! validated as soon as an event is added; event type resolution waits
//! until send time.

use serde::Serialize;

use crate::error::{EventsError, Result};
use crate::event_types::{ContentType, EventTypes};
use crate::identifiers::{AggregateRootId, EventSourceId, EventType};
use crate::versions::AggregateRootVersion;

/// How the event type of an uncommitted event is determined
#[derive(Debug, Clone, PartialEq)]
pub enum EventTypeReference {
    /// Given explicitly by the caller
    Explicit(EventType),
    /// Looked up from the content's Rust type at send time
    Inferred(ContentType),
}

impl EventTypeReference {
    /// Resolve against a registry
    ///
    /// # Errors
    /// Returns `EventsError::UnknownEventType` for unregistered inferred types.
    pub fn resolve(&self, event_types: &EventTypes) -> Result<EventType> {
        match self {
            EventTypeReference::Explicit(event_type) => Ok(event_type.clone()),
            EventTypeReference::Inferred(content_type) => event_types.resolve(content_type),
        }
    }
}

fn serialize_content<T: Serialize>(content: &T) -> Result<serde_json::Value> {
    serde_json::to_value(content)
        .map_err(|e| EventsError::EventContentCouldNotBeSerialized(e.to_string()))
}

fn ensure_defined(content: &serde_json::Value) -> Result<()> {
    if content.is_null() {
        return Err(EventsError::EventContentNeedsToBeDefined);
    }
    Ok(())
}

// =============================================================================
// UncommittedEvent
// =============================================================================

/// An event waiting to be committed to an event source
#[derive(Debug, Clone, PartialEq)]
pub struct UncommittedEvent {
    /// JSON content
    pub content: serde_json::Value,
    /// Event source the event is committed to
    pub event_source_id: EventSourceId,
    /// Event type, explicit or inferred
    pub event_type: EventTypeReference,
    /// Whether the event is visible outside its tenant and scope
    pub is_public: bool,
}

impl UncommittedEvent {
    /// Create an event with an explicit event type
    pub fn new(
        content: serde_json::Value,
        event_source_id: EventSourceId,
        event_type: EventType,
    ) -> Self {
        Self {
            content,
            event_source_id,
            event_type: EventTypeReference::Explicit(event_type),
            is_public: false,
        }
    }

    /// Create an event whose type is inferred from `T` at send time
    ///
    /// # Errors
    /// Returns `EventsError::EventContentCouldNotBeSerialized` if `content`
    /// does not serialize to JSON.
    pub fn from_content<T: Serialize + 'static>(
        content: &T,
        event_source_id: EventSourceId,
    ) -> Result<Self> {
        Ok(Self {
            content: serialize_content(content)?,
            event_source_id,
            event_type: EventTypeReference::Inferred(ContentType::of::<T>()),
            is_public: false,
        })
    }

    /// Override the event type
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = EventTypeReference::Explicit(event_type);
        self
    }

    /// Mark the event public
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Check the event can be sent
    ///
    /// # Errors
    /// Returns `EventsError::EventContentNeedsToBeDefined` for null content.
    pub fn validate(&self) -> Result<()> {
        ensure_defined(&self.content)
    }
}

// =============================================================================
// UncommittedEvents
// =============================================================================

/// A batch of uncommitted events sent in one commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UncommittedEvents {
    events: Vec<UncommittedEvent>,
}

impl UncommittedEvents {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from contents paired with explicit event types
    ///
    /// # Errors
    /// Returns `EventsError::EventTypesCountMismatch` if the lists differ in
    /// length, or a content error from the first invalid content.
    pub fn with_event_types<T: Serialize>(
        contents: &[T],
        event_source_id: EventSourceId,
        event_types: Vec<EventType>,
    ) -> Result<Self> {
        if contents.len() != event_types.len() {
            return Err(EventsError::EventTypesCountMismatch {
                events: contents.len(),
                event_types: event_types.len(),
            });
        }

        let mut events = Self::new();
        for (content, event_type) in contents.iter().zip(event_types) {
            events.push(UncommittedEvent::new(
                serialize_content(content)?,
                event_source_id,
                event_type,
            ))?;
        }
        Ok(events)
    }

    /// Append an event
    ///
    /// # Errors
    /// Returns `EventsError::EventContentNeedsToBeDefined` for null content.
    pub fn push(&mut self, event: UncommittedEvent) -> Result<()> {
        event.validate()?;
        self.events.push(event);
        Ok(())
    }

    /// Check every event can be sent
    ///
    /// # Errors
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<()> {
        self.events.iter().try_for_each(UncommittedEvent::validate)
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate events in order
    pub fn iter(&self) -> std::slice::Iter<'_, UncommittedEvent> {
        self.events.iter()
    }
}

impl From<UncommittedEvent> for UncommittedEvents {
    fn from(event: UncommittedEvent) -> Self {
        Self {
            events: vec![event],
        }
    }
}

impl From<Vec<UncommittedEvent>> for UncommittedEvents {
    fn from(events: Vec<UncommittedEvent>) -> Self {
        Self { events }
    }
}

impl IntoIterator for UncommittedEvents {
    type Item = UncommittedEvent;
    type IntoIter = std::vec::IntoIter<UncommittedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a UncommittedEvents {
    type Item = &'a UncommittedEvent;
    type IntoIter = std::slice::Iter<'a, UncommittedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// =============================================================================
// Aggregate events
// =============================================================================

/// An event waiting to be applied by an aggregate root
#[derive(Debug, Clone, PartialEq)]
pub struct UncommittedAggregateEvent {
    /// JSON content
    pub content: serde_json::Value,
    /// Event type, explicit or inferred
    pub event_type: EventTypeReference,
    /// Whether the event is visible outside its tenant and scope
    pub is_public: bool,
}

impl UncommittedAggregateEvent {
    /// Create an event with an explicit event type
    pub fn new(content: serde_json::Value, event_type: EventType) -> Self {
        Self {
            content,
            event_type: EventTypeReference::Explicit(event_type),
            is_public: false,
        }
    }

    /// Create an event whose type is inferred from `T` at send time
    ///
    /// # Errors
    /// Returns `EventsError::EventContentCouldNotBeSerialized` if `content`
    /// does not serialize to JSON.
    pub fn from_content<T: Serialize + 'static>(content: &T) -> Result<Self> {
        Ok(Self {
            content: serialize_content(content)?,
            event_type: EventTypeReference::Inferred(ContentType::of::<T>()),
            is_public: false,
        })
    }

    /// Override the event type
    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = EventTypeReference::Explicit(event_type);
        self
    }

    /// Mark the event public
    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }
}

/// Events an aggregate root applies to one event source in one commit.
///
/// The expected version is the aggregate root version the caller saw
/// before applying these events.
#[derive(Debug, Clone, PartialEq)]
pub struct UncommittedAggregateEvents {
    event_source_id: EventSourceId,
    aggregate_root_id: AggregateRootId,
    expected_aggregate_root_version: AggregateRootVersion,
    events: Vec<UncommittedAggregateEvent>,
}

impl UncommittedAggregateEvents {
    /// Create an empty set of aggregate events
    pub fn new(
        event_source_id: EventSourceId,
        aggregate_root_id: AggregateRootId,
        expected_aggregate_root_version: AggregateRootVersion,
    ) -> Self {
        Self {
            event_source_id,
            aggregate_root_id,
            expected_aggregate_root_version,
            events: Vec::new(),
        }
    }

    /// Append an event
    ///
    /// # Errors
    /// Returns `EventsError::EventContentNeedsToBeDefined` for null content.
    pub fn add(&mut self, event: UncommittedAggregateEvent) -> Result<()> {
        ensure_defined(&event.content)?;
        self.events.push(event);
        Ok(())
    }

    /// Event source the events are applied to
    pub fn event_source_id(&self) -> EventSourceId {
        self.event_source_id
    }

    /// Aggregate root applying the events
    pub fn aggregate_root_id(&self) -> AggregateRootId {
        self.aggregate_root_id
    }

    /// Version the aggregate root is expected to be at
    pub fn expected_aggregate_root_version(&self) -> AggregateRootVersion {
        self.expected_aggregate_root_version
    }

    /// Whether any events were added
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events were added
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate events in order
    pub fn iter(&self) -> std::slice::Iter<'_, UncommittedAggregateEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a UncommittedAggregateEvents {
    type Item = &'a UncommittedAggregateEvent;
    type IntoIter = std::slice::Iter<'a, UncommittedAggregateEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
