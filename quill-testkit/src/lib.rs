//! Test helpers for Quill clients.
//!
//! Provides in-memory stand-ins for the runtime services and fixtures for
//! building execution contexts, events and projection requests.

mod event_store;
mod helpers;
mod projections;

pub use event_store::{InMemoryEventStore, AGGREGATE_CONCURRENCY_CONFLICT, INVALID_REQUEST};
pub use helpers::{
    call_context, committed_event, event_type, execution_context, projection_request,
    stream_event,
};
pub use projections::{InMemoryProjections, InMemoryReverseCall, RuntimeSession};
