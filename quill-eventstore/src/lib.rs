//! Quill Event Store Client
//!
//! Commits events and aggregate events to the runtime and fetches the
//! events an aggregate root has applied.
//!
//! # Architecture
//!
//! ```text
//! Uncommitted* → validate → resolve event types → Connection → decode → Committed*
//! ```
//!
//! Runtime failures (such as an optimistic concurrency conflict) come back
//! as data in the commit results. Transport errors and protocol violations
//! reject the call; nothing is retried here.

#![warn(clippy::all)]

pub mod builder;
pub mod client;
pub mod connection;
pub mod error;
pub mod requests;
pub mod result;

// Re-exports for convenience
pub use builder::{ExpectedAggregateVersion, ForAggregate, ForAggregateEventSource};
pub use client::EventStore;
pub use connection::{EventStoreConnection, TransportError};
pub use error::{EventStoreError, Result};
pub use requests::{
    CommitAggregateEventsRequest, CommitAggregateEventsResponse, CommitEventsRequest,
    CommitEventsResponse, FetchForAggregateRequest, FetchForAggregateResponse, WireAggregate,
    WireUncommittedAggregateEvent, WireUncommittedAggregateEvents, WireUncommittedEvent,
};
pub use result::{CommitAggregateEventsResult, CommitEventsResult};
