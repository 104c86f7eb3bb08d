//! Committed events
//!
//! Committed events only come out of decoding server responses. The
//! aggregate container checks its invariants once at construction and is
//! immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::EventContent;
use crate::error::{EventsError, Result};
use crate::execution::ExecutionContext;
use crate::identifiers::{AggregateRootId, EventSourceId, EventType};
use crate::versions::{AggregateRootVersion, EventLogSequenceNumber};

// =============================================================================
// CommittedEvent
// =============================================================================

/// An event stored in the event log
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedEvent {
    pub event_log_sequence_number: EventLogSequenceNumber,
    pub occurred: DateTime<Utc>,
    pub event_source_id: EventSourceId,
    pub execution_context: ExecutionContext,
    pub event_type: EventType,
    pub content: EventContent,
    pub is_public: bool,
    /// Whether the event was received from another microservice
    pub is_external: bool,
    /// Sequence number in the producing microservice's event log
    pub external_event_log_sequence_number: EventLogSequenceNumber,
    /// When an external event was received
    pub external_event_received: DateTime<Utc>,
}

/// Events returned from a plain commit, in commit order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommittedEvents {
    events: Vec<CommittedEvent>,
}

impl CommittedEvents {
    pub fn new(events: Vec<CommittedEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommittedEvent> {
        self.events.iter()
    }

    pub fn first(&self) -> Option<&CommittedEvent> {
        self.events.first()
    }
}

impl IntoIterator for CommittedEvents {
    type Item = CommittedEvent;
    type IntoIter = std::vec::IntoIter<CommittedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommittedEvents {
    type Item = &'a CommittedEvent;
    type IntoIter = std::slice::Iter<'a, CommittedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// =============================================================================
// CommittedAggregateEvent
// =============================================================================

/// An event applied by an aggregate root
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedAggregateEvent {
    pub event_log_sequence_number: EventLogSequenceNumber,
    pub occurred: DateTime<Utc>,
    pub event_source_id: EventSourceId,
    pub aggregate_root_id: AggregateRootId,
    pub aggregate_root_version: AggregateRootVersion,
    pub execution_context: ExecutionContext,
    pub event_type: EventType,
    pub content: EventContent,
    pub is_public: bool,
}

/// Position summary of a committed aggregate event, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEventPosition {
    pub event_log_sequence_number: EventLogSequenceNumber,
    pub aggregate_root_version: AggregateRootVersion,
}

impl CommittedAggregateEvent {
    pub fn position(&self) -> AggregateEventPosition {
        AggregateEventPosition {
            event_log_sequence_number: self.event_log_sequence_number,
            aggregate_root_version: self.aggregate_root_version,
        }
    }
}

// =============================================================================
// CommittedAggregateEvents
// =============================================================================

/// An ordered, invariant-checked sequence of events one aggregate root
/// applied to one event source.
///
/// Construction guarantees, for consecutive elements:
/// - event log sequence numbers strictly increase
/// - aggregate root versions increase by exactly one, starting from the
///   version of the first element
/// - every event carries the declared event source and aggregate root
/// - no content is null
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedAggregateEvents {
    event_source_id: EventSourceId,
    aggregate_root_id: AggregateRootId,
    events: Vec<CommittedAggregateEvent>,
}

impl CommittedAggregateEvents {
    /// Validate and wrap a sequence of committed aggregate events.
    ///
    /// # Errors
    /// Returns the first invariant violation found scanning left to right.
    pub fn new(
        event_source_id: EventSourceId,
        aggregate_root_id: AggregateRootId,
        events: Vec<CommittedAggregateEvent>,
    ) -> Result<Self> {
        let mut previous_version: Option<AggregateRootVersion> = None;
        let mut previous: Option<EventLogSequenceNumber> = None;

        for event in &events {
            // The first event's version is taken as the baseline.
            let expected = match previous_version {
                None => event.aggregate_root_version,
                Some(version) => {
                    version
                        .next()
                        .ok_or(EventsError::AggregateRootVersionIsOutOfOrder {
                            actual: event.aggregate_root_version,
                            expected: version,
                        })?
                }
            };

            if let Some(previous) = previous {
                if event.event_log_sequence_number <= previous {
                    return Err(EventsError::EventLogSequenceNumberIsOutOfOrder {
                        current: event.event_log_sequence_number,
                        previous,
                    });
                }
            }

            if !event.content.is_defined() {
                return Err(EventsError::EventContentNeedsToBeDefined);
            }

            if event.event_source_id != event_source_id {
                return Err(EventsError::EventWasAppliedToOtherEventSource {
                    event_source_id: event.event_source_id,
                    expected: event_source_id,
                });
            }

            if event.aggregate_root_id != aggregate_root_id {
                return Err(EventsError::EventWasAppliedByOtherAggregateRoot {
                    aggregate_root_id: event.aggregate_root_id,
                    expected: aggregate_root_id,
                });
            }

            if event.aggregate_root_version != expected {
                return Err(EventsError::AggregateRootVersionIsOutOfOrder {
                    actual: event.aggregate_root_version,
                    expected,
                });
            }

            previous_version = Some(expected);
            previous = Some(event.event_log_sequence_number);
        }

        Ok(Self {
            event_source_id,
            aggregate_root_id,
            events,
        })
    }

    /// An empty sequence for an aggregate root that has applied nothing
    pub fn empty(event_source_id: EventSourceId, aggregate_root_id: AggregateRootId) -> Self {
        Self {
            event_source_id,
            aggregate_root_id,
            events: Vec::new(),
        }
    }

    pub fn event_source_id(&self) -> EventSourceId {
        self.event_source_id
    }

    pub fn aggregate_root_id(&self) -> AggregateRootId {
        self.aggregate_root_id
    }

    /// Version of the last event, or `INITIAL` when empty
    pub fn aggregate_root_version(&self) -> AggregateRootVersion {
        self.events
            .last()
            .map(|event| event.aggregate_root_version)
            .unwrap_or(AggregateRootVersion::INITIAL)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommittedAggregateEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<CommittedAggregateEvent> {
        self.events.clone()
    }
}

impl IntoIterator for CommittedAggregateEvents {
    type Item = CommittedAggregateEvent;
    type IntoIter = std::vec::IntoIter<CommittedAggregateEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a CommittedAggregateEvents {
    type Item = &'a CommittedAggregateEvent;
    type IntoIter = std::slice::Iter<'a, CommittedAggregateEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
