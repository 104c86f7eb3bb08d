//! Event store connection port
//!
//! The client talks to the runtime only through this trait. Adapters
//! implement it for a concrete transport; the testkit provides an in-memory
//! implementation.

use async_trait::async_trait;

pub use quill_domain::TransportError;

use crate::requests::{
    CommitAggregateEventsRequest, CommitAggregateEventsResponse, CommitEventsRequest,
    CommitEventsResponse, FetchForAggregateRequest, FetchForAggregateResponse,
};

/// Port for the event store service.
///
/// Implementations:
/// - `InMemoryEventStore` (quill-testkit) - optimistic concurrency in memory
#[async_trait]
pub trait EventStoreConnection: Send + Sync {
    /// Commit a batch of events
    async fn commit(
        &self,
        request: CommitEventsRequest,
    ) -> Result<CommitEventsResponse, TransportError>;

    /// Commit events applied by an aggregate root
    async fn commit_for_aggregate(
        &self,
        request: CommitAggregateEventsRequest,
    ) -> Result<CommitAggregateEventsResponse, TransportError>;

    /// Fetch all events an aggregate root applied to an event source
    async fn fetch_for_aggregate(
        &self,
        request: FetchForAggregateRequest,
    ) -> Result<FetchForAggregateResponse, TransportError>;
}
