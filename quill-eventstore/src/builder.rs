//! Staged aggregate commit builder
//!
//! ```rust,ignore
//! store
//!     .for_aggregate(kitchen)
//!     .with_event_source(order)
//!     .expect_version(version)
//!     .commit_event(&DishPrepared { .. }, &cancel)
//!     .await?;
//! ```
//!
//! Every stage consumes the previous one, so each step can only be taken once.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use quill_domain::{
    AggregateRootId, AggregateRootVersion, CommittedAggregateEvents, EventSourceId,
    UncommittedAggregateEvent, UncommittedAggregateEvents,
};

use crate::client::EventStore;
use crate::connection::EventStoreConnection;
use crate::error::Result;
use crate::result::CommitAggregateEventsResult;

/// First stage: the aggregate root is known
pub struct ForAggregate<'a, C> {
    store: &'a EventStore<C>,
    aggregate_root_id: AggregateRootId,
}

impl<'a, C: EventStoreConnection> ForAggregate<'a, C> {
    pub(crate) fn new(store: &'a EventStore<C>, aggregate_root_id: AggregateRootId) -> Self {
        Self {
            store,
            aggregate_root_id,
        }
    }

    /// Choose the event source the aggregate root applies events to
    pub fn with_event_source(
        self,
        event_source_id: EventSourceId,
    ) -> ForAggregateEventSource<'a, C> {
        ForAggregateEventSource {
            store: self.store,
            aggregate_root_id: self.aggregate_root_id,
            event_source_id,
        }
    }
}

/// Second stage: aggregate root and event source are known
pub struct ForAggregateEventSource<'a, C> {
    store: &'a EventStore<C>,
    aggregate_root_id: AggregateRootId,
    event_source_id: EventSourceId,
}

impl<'a, C: EventStoreConnection> ForAggregateEventSource<'a, C> {
    /// Set the version the aggregate root is expected to be at
    pub fn expect_version(self, version: AggregateRootVersion) -> ExpectedAggregateVersion<'a, C> {
        ExpectedAggregateVersion {
            store: self.store,
            events: UncommittedAggregateEvents::new(
                self.event_source_id,
                self.aggregate_root_id,
                version,
            ),
        }
    }

    /// Fetch the events applied so far
    ///
    /// # Errors
    /// See [`EventStore::fetch_for_aggregate`].
    pub async fn fetch(self, cancel: &CancellationToken) -> Result<CommittedAggregateEvents> {
        self.store
            .fetch_for_aggregate(self.aggregate_root_id, self.event_source_id, cancel)
            .await
    }
}

/// Final stage: ready to commit
pub struct ExpectedAggregateVersion<'a, C> {
    store: &'a EventStore<C>,
    events: UncommittedAggregateEvents,
}

impl<'a, C: EventStoreConnection> ExpectedAggregateVersion<'a, C> {
    /// Commit the given events
    ///
    /// # Errors
    /// Returns `EventsError::EventContentNeedsToBeDefined` for null content,
    /// otherwise see [`EventStore::commit_for_aggregate`].
    pub async fn commit(
        mut self,
        events: impl IntoIterator<Item = UncommittedAggregateEvent>,
        cancel: &CancellationToken,
    ) -> Result<CommitAggregateEventsResult> {
        for event in events {
            self.events.add(event)?;
        }
        self.store.commit_for_aggregate(self.events, cancel).await
    }

    /// Commit one event, inferring its event type
    ///
    /// # Errors
    /// See [`ExpectedAggregateVersion::commit`].
    pub async fn commit_event<T: Serialize + 'static>(
        self,
        content: &T,
        cancel: &CancellationToken,
    ) -> Result<CommitAggregateEventsResult> {
        let event = UncommittedAggregateEvent::from_content(content)?;
        self.commit([event], cancel).await
    }
}
