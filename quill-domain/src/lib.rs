//! Quill Domain Layer
//!
//! Identifiers, event containers and wire shapes shared by the event store
//! and projections clients. No I/O.
//!
//! # Components
//!
//! - **Uncommitted**: events built by application code, validated on append
//! - **Committed**: events decoded from the runtime; aggregate sequences are
//!   invariant-checked on construction
//! - **Event types**: registry mapping Rust types to event types and back
//! - **Protocol**: transport-agnostic message shapes and their codec

#![warn(clippy::all)]

pub mod build;
pub mod committed;
pub mod content;
pub mod error;
pub mod event_types;
pub mod execution;
pub mod identifiers;
pub mod protocol;
pub mod transport;
pub mod uncommitted;
pub mod versions;

// Re-export commonly used types
pub use build::{BuildResult, BuildResultKind, BuildResults};
pub use committed::{
    AggregateEventPosition, CommittedAggregateEvent, CommittedAggregateEvents, CommittedEvent,
    CommittedEvents,
};
pub use content::{EventContent, TypedContent};
pub use error::{EventsError, Result};
pub use event_types::{ContentType, EventTypes};
pub use execution::{CallContext, Claim, ExecutionContext, Version, DEVELOPMENT_TENANT};
pub use identifiers::{
    AggregateRootId, EventSourceId, EventType, EventTypeId, Generation, MicroserviceId, TenantId,
};
pub use protocol::{Failure, ProtocolError};
pub use transport::TransportError;
pub use uncommitted::{
    EventTypeReference, UncommittedAggregateEvent, UncommittedAggregateEvents, UncommittedEvent,
    UncommittedEvents,
};
pub use versions::{AggregateRootVersion, EventLogSequenceNumber};
