//! Wire protocol
//!
//! Transport-agnostic message shapes exchanged with the runtime, and the
//! codec between them and domain types. Identifiers travel as 16 raw bytes,
//! timestamps as seconds plus nanoseconds, and event content as JSON text.
//! The event type alias never goes on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::committed::{
    CommittedAggregateEvent, CommittedAggregateEvents, CommittedEvent, CommittedEvents,
};
use crate::content::EventContent;
use crate::error::EventsError;
use crate::event_types::EventTypes;
use crate::execution::{CallContext, Claim, ExecutionContext, Version};
use crate::identifiers::{AggregateRootId, EventSourceId, EventType, EventTypeId, Generation};
use crate::versions::{AggregateRootVersion, EventLogSequenceNumber};

// =============================================================================
// Errors
// =============================================================================

/// The runtime sent something that breaks the protocol contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A message that must carry an execution context did not
    #[error("Missing execution context")]
    MissingExecutionContext,

    /// A committed event had no event type
    #[error("Missing event type")]
    MissingEventType,

    /// A required timestamp was absent
    #[error("Missing timestamp: {0}")]
    MissingTimestamp(&'static str),

    /// An identifier was not exactly 16 bytes
    #[error("Invalid identifier in {field}: expected 16 bytes, got {length}")]
    InvalidIdentifier {
        /// Field holding the identifier
        field: &'static str,
        /// Number of bytes received
        length: usize,
    },

    /// A timestamp was outside the representable range
    #[error("Invalid timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp {
        /// Seconds since the Unix epoch
        seconds: i64,
        /// Nanosecond part
        nanos: i32,
    },

    /// Event content was not valid JSON, or not the registered type
    #[error("Invalid event content: {0}")]
    InvalidEventContent(String),

    /// A response held no events where at least one was expected
    #[error("Missing events in response")]
    MissingEvents,

    /// The reported aggregate root version cannot cover the returned events
    #[error("Aggregate root version {version} is too small for {events} events")]
    InvalidAggregateRootVersion {
        /// Version reported by the runtime
        version: u64,
        /// Number of events returned
        events: usize,
    },

    /// Decoded events broke a domain invariant
    #[error(transparent)]
    Events(#[from] EventsError),
}

/// Result type for protocol decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

// =============================================================================
// Primitives
// =============================================================================

/// A UUID as 16 raw bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUuid {
    pub value: Vec<u8>,
}

impl WireUuid {
    /// Decode into any UUID-backed identifier
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidIdentifier` unless there are exactly 16 bytes.
    pub fn decode<T: From<Uuid>>(&self, field: &'static str) -> Result<T> {
        Uuid::from_slice(&self.value)
            .map(T::from)
            .map_err(|_| ProtocolError::InvalidIdentifier {
                field,
                length: self.value.len(),
            })
    }

    /// Encode any UUID-backed identifier
    pub fn encode<T: Into<Uuid>>(id: T) -> Self {
        Self {
            value: id.into().as_bytes().to_vec(),
        }
    }
}

/// A UTC timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl WireTimestamp {
    /// # Errors
    /// Returns `ProtocolError::InvalidTimestamp` for negative nanos or
    /// out-of-range values.
    pub fn decode(&self) -> Result<DateTime<Utc>> {
        let invalid = ProtocolError::InvalidTimestamp {
            seconds: self.seconds,
            nanos: self.nanos,
        };
        let nanos = u32::try_from(self.nanos).map_err(|_| invalid.clone())?;
        DateTime::from_timestamp(self.seconds, nanos).ok_or(invalid)
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(timestamp: DateTime<Utc>) -> Self {
        Self {
            seconds: timestamp.timestamp(),
            nanos: timestamp.timestamp_subsec_nanos() as i32,
        }
    }
}

fn required_timestamp(
    timestamp: Option<WireTimestamp>,
    field: &'static str,
) -> Result<DateTime<Utc>> {
    timestamp.ok_or(ProtocolError::MissingTimestamp(field))?.decode()
}

// =============================================================================
// Contexts
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
    pub pre_release_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireClaim {
    pub key: String,
    pub value: String,
    pub value_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireExecutionContext {
    pub microservice_id: WireUuid,
    pub tenant_id: WireUuid,
    pub version: WireVersion,
    pub correlation_id: WireUuid,
    pub claims: Vec<WireClaim>,
    pub environment: String,
}

impl From<&ExecutionContext> for WireExecutionContext {
    fn from(context: &ExecutionContext) -> Self {
        Self {
            microservice_id: WireUuid::encode(context.microservice_id),
            tenant_id: WireUuid::encode(context.tenant_id),
            version: WireVersion {
                major: context.version.major,
                minor: context.version.minor,
                patch: context.version.patch,
                build: context.version.build,
                pre_release_string: context.version.pre_release.clone(),
            },
            correlation_id: WireUuid::encode(context.correlation_id),
            claims: context
                .claims
                .iter()
                .map(|claim| WireClaim {
                    key: claim.key.clone(),
                    value: claim.value.clone(),
                    value_type: claim.value_type.clone(),
                })
                .collect(),
            environment: context.environment.clone(),
        }
    }
}

impl TryFrom<WireExecutionContext> for ExecutionContext {
    type Error = ProtocolError;

    fn try_from(wire: WireExecutionContext) -> Result<Self> {
        Ok(Self {
            microservice_id: wire.microservice_id.decode("execution_context.microservice_id")?,
            tenant_id: wire.tenant_id.decode("execution_context.tenant_id")?,
            version: Version {
                major: wire.version.major,
                minor: wire.version.minor,
                patch: wire.version.patch,
                build: wire.version.build,
                pre_release: wire.version.pre_release_string,
            },
            correlation_id: wire.correlation_id.decode("execution_context.correlation_id")?,
            claims: wire
                .claims
                .into_iter()
                .map(|claim| Claim {
                    key: claim.key,
                    value: claim.value,
                    value_type: claim.value_type,
                })
                .collect(),
            environment: wire.environment,
        })
    }
}

/// Decode an optional execution context, failing when absent
///
/// # Errors
/// Returns `ProtocolError::MissingExecutionContext` for `None`.
pub fn decode_execution_context(wire: Option<WireExecutionContext>) -> Result<ExecutionContext> {
    wire.ok_or(ProtocolError::MissingExecutionContext)?.try_into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCallContext {
    pub execution_context: Option<WireExecutionContext>,
    pub head_id: WireUuid,
}

impl From<&CallContext> for WireCallContext {
    fn from(context: &CallContext) -> Self {
        Self {
            execution_context: Some((&context.execution_context).into()),
            head_id: WireUuid::encode(context.head_id),
        }
    }
}

impl TryFrom<WireCallContext> for CallContext {
    type Error = ProtocolError;

    fn try_from(wire: WireCallContext) -> Result<Self> {
        Ok(Self {
            execution_context: decode_execution_context(wire.execution_context)?,
            head_id: wire.head_id.decode("call_context.head_id")?,
        })
    }
}

// =============================================================================
// Event types and failures
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEventType {
    pub id: WireUuid,
    pub generation: u32,
}

impl From<&EventType> for WireEventType {
    fn from(event_type: &EventType) -> Self {
        Self {
            id: WireUuid::encode(event_type.id()),
            generation: event_type.generation().value(),
        }
    }
}

impl TryFrom<WireEventType> for EventType {
    type Error = ProtocolError;

    fn try_from(wire: WireEventType) -> Result<Self> {
        let id: EventTypeId = wire.id.decode("event_type.id")?;
        Ok(EventType::new(id, Generation::new(wire.generation)))
    }
}

/// Decode an optional event type, failing when absent
///
/// # Errors
/// Returns `ProtocolError::MissingEventType` for `None`.
pub fn decode_event_type(wire: Option<WireEventType>) -> Result<EventType> {
    wire.ok_or(ProtocolError::MissingEventType)?.try_into()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFailure {
    pub id: WireUuid,
    pub reason: String,
}

/// A failure reported by the runtime.
///
/// Failures are outcomes, not errors: a rejected commit is returned to the
/// caller as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub id: Uuid,
    pub reason: String,
}

impl Failure {
    pub fn new(id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason, self.id)
    }
}

impl From<&Failure> for WireFailure {
    fn from(failure: &Failure) -> Self {
        Self {
            id: WireUuid::encode(failure.id),
            reason: failure.reason.clone(),
        }
    }
}

impl TryFrom<WireFailure> for Failure {
    type Error = ProtocolError;

    fn try_from(wire: WireFailure) -> Result<Self> {
        Ok(Self {
            id: wire.id.decode("failure.id")?,
            reason: wire.reason,
        })
    }
}

// =============================================================================
// Content
// =============================================================================

/// Serialize content to JSON text
pub fn encode_content(content: &serde_json::Value) -> String {
    content.to_string()
}

/// Parse JSON text and decode it through the registry
///
/// # Errors
/// Returns `ProtocolError::InvalidEventContent` for unparsable JSON or JSON a
/// registered type rejects.
pub fn decode_content(
    event_type: &EventType,
    text: &str,
    event_types: &EventTypes,
) -> Result<EventContent> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ProtocolError::InvalidEventContent(e.to_string()))?;
    event_types
        .decode(event_type, json)
        .map_err(|e| ProtocolError::InvalidEventContent(format!("{}: {}", event_type, e)))
}

// =============================================================================
// Committed events
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommittedEvent {
    pub event_log_sequence_number: u64,
    pub occurred: Option<WireTimestamp>,
    pub event_source_id: WireUuid,
    pub execution_context: Option<WireExecutionContext>,
    pub event_type: Option<WireEventType>,
    pub content: String,
    pub public: bool,
    pub external: bool,
    pub external_event_log_sequence_number: u64,
    pub external_event_received: Option<WireTimestamp>,
}

/// Encode a committed event
pub fn encode_committed_event(event: &CommittedEvent) -> WireCommittedEvent {
    WireCommittedEvent {
        event_log_sequence_number: event.event_log_sequence_number.value(),
        occurred: Some(event.occurred.into()),
        event_source_id: WireUuid::encode(event.event_source_id),
        execution_context: Some((&event.execution_context).into()),
        event_type: Some((&event.event_type).into()),
        content: encode_content(event.content.json()),
        public: event.is_public,
        external: event.is_external,
        external_event_log_sequence_number: event.external_event_log_sequence_number.value(),
        external_event_received: Some(event.external_event_received.into()),
    }
}

/// Decode a committed event
///
/// A missing receive timestamp is only accepted for non-external events, and
/// decodes to the Unix epoch.
///
/// # Errors
/// Returns a `ProtocolError` for any missing or malformed field.
pub fn decode_committed_event(
    wire: WireCommittedEvent,
    event_types: &EventTypes,
) -> Result<CommittedEvent> {
    let event_type = decode_event_type(wire.event_type)?;
    let content = decode_content(&event_type, &wire.content, event_types)?;
    let external_event_received = match wire.external_event_received {
        Some(timestamp) => timestamp.decode()?,
        None if wire.external => {
            return Err(ProtocolError::MissingTimestamp("external_event_received"))
        }
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(CommittedEvent {
        event_log_sequence_number: EventLogSequenceNumber::new(wire.event_log_sequence_number),
        occurred: required_timestamp(wire.occurred, "occurred")?,
        event_source_id: wire.event_source_id.decode("event_source_id")?,
        execution_context: decode_execution_context(wire.execution_context)?,
        event_type,
        content,
        is_public: wire.public,
        is_external: wire.external,
        external_event_log_sequence_number: EventLogSequenceNumber::new(
            wire.external_event_log_sequence_number,
        ),
        external_event_received,
    })
}

/// Decode the events of a plain commit response
///
/// # Errors
/// Returns `ProtocolError::MissingEvents` when `expected` events were sent
/// but none came back, or the first decoding error.
pub fn decode_committed_events(
    wire: Vec<WireCommittedEvent>,
    expected: usize,
    event_types: &EventTypes,
) -> Result<CommittedEvents> {
    if expected > 0 && wire.is_empty() {
        return Err(ProtocolError::MissingEvents);
    }
    wire.into_iter()
        .map(|event| decode_committed_event(event, event_types))
        .collect::<Result<Vec<_>>>()
        .map(CommittedEvents::new)
}

// =============================================================================
// Committed aggregate events
// =============================================================================

/// An aggregate event on the wire. Identity and version come from the
/// enclosing [`WireCommittedAggregateEvents`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommittedAggregateEvent {
    pub event_log_sequence_number: u64,
    pub occurred: Option<WireTimestamp>,
    pub execution_context: Option<WireExecutionContext>,
    pub event_type: Option<WireEventType>,
    pub content: String,
    pub public: bool,
}

/// Events one aggregate root applied, with the version after the last one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommittedAggregateEvents {
    pub event_source_id: WireUuid,
    pub aggregate_root_id: WireUuid,
    pub aggregate_root_version: u64,
    pub events: Vec<WireCommittedAggregateEvent>,
}

/// Encode committed aggregate events
pub fn encode_committed_aggregate_events(
    events: &CommittedAggregateEvents,
) -> WireCommittedAggregateEvents {
    WireCommittedAggregateEvents {
        event_source_id: WireUuid::encode(events.event_source_id()),
        aggregate_root_id: WireUuid::encode(events.aggregate_root_id()),
        aggregate_root_version: events.aggregate_root_version().value(),
        events: events
            .iter()
            .map(|event| WireCommittedAggregateEvent {
                event_log_sequence_number: event.event_log_sequence_number.value(),
                occurred: Some(event.occurred.into()),
                execution_context: Some((&event.execution_context).into()),
                event_type: Some((&event.event_type).into()),
                content: encode_content(event.content.json()),
                public: event.is_public,
            })
            .collect(),
    }
}

/// Decode committed aggregate events against the identity the caller asked for.
///
/// The runtime reports only the version after the last event, so the
/// version of event `i` of `n` is `version - (n - 1) + i`.
///
/// # Errors
/// Returns `ProtocolError::InvalidAggregateRootVersion` if the version is
/// smaller than `n - 1`, a decoding error for any malformed event, or
/// `ProtocolError::Events` if the decoded sequence breaks an invariant.
pub fn decode_committed_aggregate_events(
    event_source_id: EventSourceId,
    aggregate_root_id: AggregateRootId,
    wire: WireCommittedAggregateEvents,
    event_types: &EventTypes,
) -> Result<CommittedAggregateEvents> {
    let count = wire.events.len();
    if count == 0 {
        return Ok(CommittedAggregateEvents::empty(event_source_id, aggregate_root_id));
    }

    let first_version = wire
        .aggregate_root_version
        .checked_sub(count as u64 - 1)
        .ok_or(ProtocolError::InvalidAggregateRootVersion {
            version: wire.aggregate_root_version,
            events: count,
        })?;
    let wire_source: EventSourceId = wire.event_source_id.decode("event_source_id")?;
    let wire_root: AggregateRootId = wire.aggregate_root_id.decode("aggregate_root_id")?;

    let events = wire
        .events
        .into_iter()
        .enumerate()
        .map(|(index, event)| {
            let event_type = decode_event_type(event.event_type)?;
            let content = decode_content(&event_type, &event.content, event_types)?;
            Ok(CommittedAggregateEvent {
                event_log_sequence_number: EventLogSequenceNumber::new(
                    event.event_log_sequence_number,
                ),
                occurred: required_timestamp(event.occurred, "occurred")?,
                event_source_id: wire_source,
                aggregate_root_id: wire_root,
                aggregate_root_version: AggregateRootVersion::new(first_version + index as u64),
                execution_context: decode_execution_context(event.execution_context)?,
                event_type,
                content,
                is_public: event.public,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CommittedAggregateEvents::new(event_source_id, aggregate_root_id, events)?)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DEVELOPMENT_TENANT;
    use crate::identifiers::{MicroserviceId, TenantId};
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct DishPrepared {
        dish: String,
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            MicroserviceId::generate(),
            TenantId::from(DEVELOPMENT_TENANT),
            Version {
                build: 4,
                pre_release: "beta".to_string(),
                ..Version::new(1, 2, 3)
            },
            "Development",
        )
        .with_claims(vec![Claim {
            key: "role".to_string(),
            value: "chef".to_string(),
            value_type: "string".to_string(),
        }])
    }

    fn committed_event() -> CommittedEvent {
        CommittedEvent {
            event_log_sequence_number: EventLogSequenceNumber::new(42),
            occurred: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
            event_source_id: EventSourceId::generate(),
            execution_context: context(),
            event_type: EventType::new(EventTypeId::generate(), Generation::new(2)),
            content: EventContent::from(json!({"dish": "Taco", "price": 4.5})),
            is_public: true,
            is_external: true,
            external_event_log_sequence_number: EventLogSequenceNumber::new(7),
            external_event_received: Utc.timestamp_opt(1_700_000_100, 987_654_321).unwrap(),
        }
    }

    fn wire_aggregate_event(
        sequence_number: u64,
        event_type: &EventType,
    ) -> WireCommittedAggregateEvent {
        WireCommittedAggregateEvent {
            event_log_sequence_number: sequence_number,
            occurred: Some(Utc::now().into()),
            execution_context: Some((&context()).into()),
            event_type: Some(event_type.into()),
            content: r#"{"dish":"Taco"}"#.to_string(),
            public: false,
        }
    }

    #[test]
    fn test_committed_event_round_trip_is_exact() {
        let event = committed_event();
        let decoded =
            decode_committed_event(encode_committed_event(&event), &EventTypes::new()).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.occurred.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_missing_execution_context() {
        let mut wire = encode_committed_event(&committed_event());
        wire.execution_context = None;
        assert_eq!(
            decode_committed_event(wire, &EventTypes::new()),
            Err(ProtocolError::MissingExecutionContext)
        );
    }

    #[test]
    fn test_missing_event_type() {
        let mut wire = encode_committed_event(&committed_event());
        wire.event_type = None;
        assert_eq!(
            decode_committed_event(wire, &EventTypes::new()),
            Err(ProtocolError::MissingEventType)
        );
    }

    #[test]
    fn test_missing_occurred() {
        let mut wire = encode_committed_event(&committed_event());
        wire.occurred = None;
        assert_eq!(
            decode_committed_event(wire, &EventTypes::new()),
            Err(ProtocolError::MissingTimestamp("occurred"))
        );
    }

    #[test]
    fn test_short_identifier() {
        let mut wire = encode_committed_event(&committed_event());
        wire.event_source_id = WireUuid { value: vec![1, 2, 3] };
        assert_eq!(
            decode_committed_event(wire, &EventTypes::new()),
            Err(ProtocolError::InvalidIdentifier {
                field: "event_source_id",
                length: 3
            })
        );
    }

    #[test]
    fn test_negative_nanos() {
        let timestamp = WireTimestamp {
            seconds: 0,
            nanos: -1,
        };
        assert!(matches!(timestamp.decode(), Err(ProtocolError::InvalidTimestamp { .. })));
    }

    #[test]
    fn test_unparsable_content() {
        let mut wire = encode_committed_event(&committed_event());
        wire.content = "{not json".to_string();
        assert!(matches!(
            decode_committed_event(wire, &EventTypes::new()),
            Err(ProtocolError::InvalidEventContent(_))
        ));
    }

    #[test]
    fn test_registered_content_is_typed() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let mut registry = EventTypes::new();
        registry.register::<DishPrepared>(event_type.clone()).unwrap();

        let wire = WireCommittedAggregateEvents {
            event_source_id: WireUuid::encode(EventSourceId::generate()),
            aggregate_root_id: WireUuid::encode(AggregateRootId::generate()),
            aggregate_root_version: 1,
            events: vec![wire_aggregate_event(0, &event_type)],
        };
        let source = wire.event_source_id.decode("test").unwrap();
        let root = wire.aggregate_root_id.decode("test").unwrap();

        let events = decode_committed_aggregate_events(source, root, wire, &registry).unwrap();
        let first = events.iter().next().unwrap();
        assert_eq!(first.content.downcast_ref::<DishPrepared>().unwrap().dish, "Taco");
    }

    #[test]
    fn test_aggregate_versions_are_reconstructed() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        let wire = WireCommittedAggregateEvents {
            event_source_id: WireUuid::encode(source),
            aggregate_root_id: WireUuid::encode(root),
            aggregate_root_version: 5,
            events: vec![
                wire_aggregate_event(10, &event_type),
                wire_aggregate_event(11, &event_type),
                wire_aggregate_event(12, &event_type),
            ],
        };

        let events =
            decode_committed_aggregate_events(source, root, wire, &EventTypes::new()).unwrap();
        let versions: Vec<u64> = events.iter().map(|e| e.aggregate_root_version.value()).collect();
        assert_eq!(versions, vec![3, 4, 5]);
        assert_eq!(events.aggregate_root_version(), AggregateRootVersion::new(5));
    }

    #[test]
    fn test_aggregate_version_at_max_is_decoded() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        let wire = WireCommittedAggregateEvents {
            event_source_id: WireUuid::encode(source),
            aggregate_root_id: WireUuid::encode(root),
            aggregate_root_version: u64::MAX,
            events: vec![
                wire_aggregate_event(u64::MAX - 1, &event_type),
                wire_aggregate_event(u64::MAX, &event_type),
            ],
        };

        let events =
            decode_committed_aggregate_events(source, root, wire, &EventTypes::new()).unwrap();

        let versions: Vec<u64> = events.iter().map(|e| e.aggregate_root_version.value()).collect();
        assert_eq!(versions, vec![u64::MAX - 1, u64::MAX]);
        assert_eq!(events.aggregate_root_version(), AggregateRootVersion::new(u64::MAX));
    }

    #[test]
    fn test_aggregate_version_too_small() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        let wire = WireCommittedAggregateEvents {
            event_source_id: WireUuid::encode(source),
            aggregate_root_id: WireUuid::encode(root),
            aggregate_root_version: 1,
            events: vec![
                wire_aggregate_event(1, &event_type),
                wire_aggregate_event(2, &event_type),
                wire_aggregate_event(3, &event_type),
            ],
        };

        assert_eq!(
            decode_committed_aggregate_events(source, root, wire, &EventTypes::new()),
            Err(ProtocolError::InvalidAggregateRootVersion {
                version: 1,
                events: 3
            })
        );
    }

    #[test]
    fn test_aggregate_events_for_other_source_break_invariant() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let requested = EventSourceId::generate();
        let root = AggregateRootId::generate();
        let wire = WireCommittedAggregateEvents {
            event_source_id: WireUuid::encode(EventSourceId::generate()),
            aggregate_root_id: WireUuid::encode(root),
            aggregate_root_version: 1,
            events: vec![wire_aggregate_event(1, &event_type)],
        };

        let result = decode_committed_aggregate_events(requested, root, wire, &EventTypes::new());
        assert!(matches!(
            result,
            Err(ProtocolError::Events(EventsError::EventWasAppliedToOtherEventSource { .. }))
        ));
    }

    #[test]
    fn test_empty_aggregate_response_is_initial() {
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        let events = decode_committed_aggregate_events(
            source,
            root,
            WireCommittedAggregateEvents::default(),
            &EventTypes::new(),
        )
        .unwrap();
        assert!(events.is_empty());
        assert_eq!(events.aggregate_root_version(), AggregateRootVersion::INITIAL);
    }

    #[test]
    fn test_missing_events_when_expected() {
        assert_eq!(
            decode_committed_events(vec![], 2, &EventTypes::new()),
            Err(ProtocolError::MissingEvents)
        );
        assert!(decode_committed_events(vec![], 0, &EventTypes::new()).unwrap().is_empty());
    }

    #[test]
    fn test_failure_round_trip() {
        let failure = Failure::new(Uuid::new_v4(), "Aggregate root concurrency conflict");
        let decoded = Failure::try_from(WireFailure::from(&failure)).unwrap();
        assert_eq!(decoded, failure);
    }
}
