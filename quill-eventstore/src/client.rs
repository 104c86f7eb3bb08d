//! Event store client
//!
//! Validates and encodes uncommitted events, sends them through an
//! [`EventStoreConnection`], and decodes responses into committed
//! containers. Holds no mutable state; clones share the connection and
//! registry.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use quill_domain::protocol::{decode_committed_aggregate_events, decode_committed_events};
use quill_domain::{
    AggregateRootId, AggregateRootVersion, CallContext, CommittedAggregateEvents, EventSourceId,
    EventTypes, ExecutionContext, Failure, ProtocolError, TenantId, UncommittedAggregateEvent,
    UncommittedAggregateEvents, UncommittedEvent, UncommittedEvents,
};

use crate::builder::ForAggregate;
use crate::connection::{EventStoreConnection, TransportError};
use crate::error::{EventStoreError, Result};
use crate::requests::{CommitAggregateEventsRequest, CommitEventsRequest, FetchForAggregateRequest};
use crate::result::{CommitAggregateEventsResult, CommitEventsResult};

/// Client for committing and fetching events
pub struct EventStore<C> {
    connection: Arc<C>,
    event_types: Arc<EventTypes>,
    call_context: CallContext,
}

impl<C> Clone for EventStore<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            event_types: Arc::clone(&self.event_types),
            call_context: self.call_context.clone(),
        }
    }
}

impl<C: EventStoreConnection> EventStore<C> {
    /// Create a client.
    ///
    /// `head_id` identifies this client process to the runtime.
    pub fn new(
        connection: Arc<C>,
        event_types: Arc<EventTypes>,
        execution_context: ExecutionContext,
        head_id: Uuid,
    ) -> Self {
        Self {
            connection,
            event_types,
            call_context: CallContext::new(execution_context, head_id),
        }
    }

    /// Same client, acting for another tenant
    pub fn for_tenant(&self, tenant_id: TenantId) -> Self {
        let mut client = self.clone();
        client.call_context.execution_context =
            self.call_context.execution_context.for_tenant(tenant_id);
        client
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        &self.call_context.execution_context
    }

    pub fn event_types(&self) -> &EventTypes {
        &self.event_types
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commit a batch of events.
    ///
    /// # Errors
    /// Validation errors are returned before sending. A failure reported by
    /// the runtime is returned inside the result, not as an error.
    pub async fn commit(
        &self,
        events: impl Into<UncommittedEvents>,
        cancel: &CancellationToken,
    ) -> Result<CommitEventsResult> {
        let events = events.into();
        let request = CommitEventsRequest::new(&self.call_context, &events, &self.event_types)?;
        debug!(
            count = events.len(),
            correlation_id = %self.call_context.execution_context.correlation_id,
            "Committing events"
        );

        let response = cancellable(cancel, self.connection.commit(request)).await?;
        if let Some(failure) = response.failure {
            let failure = Failure::try_from(failure)?;
            warn!(failure = %failure, "Commit rejected by runtime");
            return Ok(CommitEventsResult::failed_with(failure));
        }

        let committed = decode_committed_events(response.events, events.len(), &self.event_types)?;
        debug!(count = committed.len(), "Committed events");
        Ok(CommitEventsResult::committed(committed))
    }

    /// Commit a single private event, inferring its event type.
    ///
    /// # Errors
    /// See [`EventStore::commit`].
    pub async fn commit_event<T: Serialize + 'static>(
        &self,
        content: &T,
        event_source_id: EventSourceId,
        cancel: &CancellationToken,
    ) -> Result<CommitEventsResult> {
        let event = UncommittedEvent::from_content(content, event_source_id)?;
        self.commit(event, cancel).await
    }

    /// Commit a single public event, inferring its event type.
    ///
    /// # Errors
    /// See [`EventStore::commit`].
    pub async fn commit_public_event<T: Serialize + 'static>(
        &self,
        content: &T,
        event_source_id: EventSourceId,
        cancel: &CancellationToken,
    ) -> Result<CommitEventsResult> {
        let event = UncommittedEvent::from_content(content, event_source_id)?.public();
        self.commit(event, cancel).await
    }

    // =========================================================================
    // Commit for aggregate
    // =========================================================================

    /// Commit events applied by an aggregate root.
    ///
    /// The response is decoded against the event source and aggregate root
    /// of `events`, and must satisfy the committed aggregate invariants.
    ///
    /// # Errors
    /// Validation, protocol and invariant errors. A concurrency conflict
    /// reported by the runtime is returned inside the result.
    pub async fn commit_for_aggregate(
        &self,
        events: UncommittedAggregateEvents,
        cancel: &CancellationToken,
    ) -> Result<CommitAggregateEventsResult> {
        let event_source_id = events.event_source_id();
        let aggregate_root_id = events.aggregate_root_id();
        let request =
            CommitAggregateEventsRequest::new(&self.call_context, &events, &self.event_types)?;
        debug!(
            %event_source_id,
            %aggregate_root_id,
            expected_version = %events.expected_aggregate_root_version(),
            count = events.len(),
            "Committing aggregate events"
        );

        let response = cancellable(cancel, self.connection.commit_for_aggregate(request)).await?;
        if let Some(failure) = response.failure {
            let failure = Failure::try_from(failure)?;
            warn!(
                %event_source_id,
                %aggregate_root_id,
                failure = %failure,
                "Aggregate commit rejected by runtime"
            );
            return Ok(CommitAggregateEventsResult::failed_with(
                CommittedAggregateEvents::empty(event_source_id, aggregate_root_id),
                failure,
            ));
        }

        let wire = match response.events {
            Some(wire) if !(events.has_events() && wire.events.is_empty()) => wire,
            _ => return Err(ProtocolError::MissingEvents.into()),
        };
        let committed = decode_committed_aggregate_events(
            event_source_id,
            aggregate_root_id,
            wire,
            &self.event_types,
        )?;
        debug!(
            %event_source_id,
            %aggregate_root_id,
            version = %committed.aggregate_root_version(),
            "Committed aggregate events"
        );
        Ok(CommitAggregateEventsResult::committed(committed))
    }

    /// Commit a single event applied by an aggregate root.
    ///
    /// # Errors
    /// See [`EventStore::commit_for_aggregate`].
    pub async fn commit_aggregate_event<T: Serialize + 'static>(
        &self,
        content: &T,
        event_source_id: EventSourceId,
        aggregate_root_id: AggregateRootId,
        expected_aggregate_root_version: AggregateRootVersion,
        cancel: &CancellationToken,
    ) -> Result<CommitAggregateEventsResult> {
        let mut events = UncommittedAggregateEvents::new(
            event_source_id,
            aggregate_root_id,
            expected_aggregate_root_version,
        );
        events.add(UncommittedAggregateEvent::from_content(content)?)?;
        self.commit_for_aggregate(events, cancel).await
    }

    /// Start building a commit for an aggregate root
    pub fn for_aggregate(&self, aggregate_root_id: AggregateRootId) -> ForAggregate<'_, C> {
        ForAggregate::new(self, aggregate_root_id)
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Fetch every event an aggregate root applied to an event source.
    ///
    /// # Errors
    /// Returns `EventStoreError::Failure` if the runtime reports a failure,
    /// before any container is built.
    pub async fn fetch_for_aggregate(
        &self,
        aggregate_root_id: AggregateRootId,
        event_source_id: EventSourceId,
        cancel: &CancellationToken,
    ) -> Result<CommittedAggregateEvents> {
        let request =
            FetchForAggregateRequest::new(&self.call_context, aggregate_root_id, event_source_id);
        debug!(%event_source_id, %aggregate_root_id, "Fetching aggregate events");

        let response = cancellable(cancel, self.connection.fetch_for_aggregate(request)).await?;
        if let Some(failure) = response.failure {
            let failure = Failure::try_from(failure)?;
            warn!(%event_source_id, %aggregate_root_id, failure = %failure, "Fetch failed");
            return Err(EventStoreError::Failure(failure));
        }

        let events = match response.events {
            Some(wire) => decode_committed_aggregate_events(
                event_source_id,
                aggregate_root_id,
                wire,
                &self.event_types,
            )?,
            None => CommittedAggregateEvents::empty(event_source_id, aggregate_root_id),
        };
        debug!(
            %event_source_id,
            %aggregate_root_id,
            count = events.len(),
            version = %events.aggregate_root_version(),
            "Fetched aggregate events"
        );
        Ok(events)
    }
}

/// Run a transport call unless the token is cancelled first.
async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Event store call cancelled");
            Err(EventStoreError::Cancelled)
        }
        result = call => Ok(result?),
    }
}
