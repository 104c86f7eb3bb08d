//! In-memory event store.
//!
//! Behaves like the runtime's event store: one global log, one stream per
//! aggregate root and event source, and optimistic concurrency on the
//! expected aggregate root version. Failures and disconnects can be
//! injected for the next call.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use quill_domain::protocol::{
    WireCallContext, WireCommittedAggregateEvent, WireCommittedAggregateEvents, WireCommittedEvent,
    WireExecutionContext, WireFailure, WireTimestamp, WireUuid,
};
use quill_domain::{AggregateRootId, AggregateRootVersion, EventSourceId, Failure, TransportError};
use quill_eventstore::{
    CommitAggregateEventsRequest, CommitAggregateEventsResponse, CommitEventsRequest,
    CommitEventsResponse, EventStoreConnection, FetchForAggregateRequest,
    FetchForAggregateResponse,
};

/// Failure id for a stale expected aggregate root version
pub const AGGREGATE_CONCURRENCY_CONFLICT: Uuid =
    Uuid::from_u128(0xf2a1_7e2c_4d25_4b6e_9c1f_3ad4_58e0_0a01);

/// Failure id for a request the store cannot read
pub const INVALID_REQUEST: Uuid = Uuid::from_u128(0xf2a1_7e2c_4d25_4b6e_9c1f_3ad4_58e0_0a02);

type StreamKey = (EventSourceId, AggregateRootId);

#[derive(Default)]
struct State {
    log: Vec<WireCommittedEvent>,
    streams: HashMap<StreamKey, Vec<WireCommittedAggregateEvent>>,
    fail_next: Option<Failure>,
    disconnect_next: bool,
    scripted_commit_for_aggregate: Option<CommitAggregateEventsResponse>,
    scripted_fetch: Option<FetchForAggregateResponse>,
}

impl State {
    /// Injected fault for this call, if any
    fn take_fault(&mut self) -> Result<Option<WireFailure>, TransportError> {
        if std::mem::take(&mut self.disconnect_next) {
            return Err(TransportError::Unavailable("Simulated disconnect".to_string()));
        }
        Ok(self.fail_next.take().map(|failure| WireFailure::from(&failure)))
    }
}

/// Event store held in memory
#[derive(Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call with this failure
    pub async fn fail_next_with(&self, failure: Failure) {
        self.state.lock().await.fail_next = Some(failure);
    }

    /// Fail the next call with a transport error
    pub async fn disconnect_next(&self) {
        self.state.lock().await.disconnect_next = true;
    }

    /// Answer the next aggregate commit with `response`, storing nothing
    pub async fn script_commit_for_aggregate(&self, response: CommitAggregateEventsResponse) {
        self.state.lock().await.scripted_commit_for_aggregate = Some(response);
    }

    /// Answer the next fetch with `response`
    pub async fn script_fetch(&self, response: FetchForAggregateResponse) {
        self.state.lock().await.scripted_fetch = Some(response);
    }

    /// Every committed event, in log order
    pub async fn committed_events(&self) -> Vec<WireCommittedEvent> {
        self.state.lock().await.log.clone()
    }

    /// Current version of an aggregate root's stream
    pub async fn aggregate_root_version(
        &self,
        event_source_id: EventSourceId,
        aggregate_root_id: AggregateRootId,
    ) -> AggregateRootVersion {
        let state = self.state.lock().await;
        let applied = state
            .streams
            .get(&(event_source_id, aggregate_root_id))
            .map_or(0, Vec::len);
        AggregateRootVersion::new(applied as u64)
    }
}

fn invalid_request(reason: impl Into<String>) -> Option<WireFailure> {
    Some(WireFailure::from(&Failure::new(INVALID_REQUEST, reason)))
}

fn execution_context_of(
    call_context: Option<WireCallContext>,
) -> Option<WireExecutionContext> {
    call_context.and_then(|context| context.execution_context)
}

#[async_trait]
impl EventStoreConnection for InMemoryEventStore {
    async fn commit(
        &self,
        request: CommitEventsRequest,
    ) -> Result<CommitEventsResponse, TransportError> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.take_fault()? {
            return Ok(CommitEventsResponse {
                failure: Some(failure),
                events: Vec::new(),
            });
        }

        let execution_context = execution_context_of(request.call_context);
        let occurred = WireTimestamp::from(Utc::now());
        let mut events = Vec::with_capacity(request.events.len());
        for event in request.events {
            let committed = WireCommittedEvent {
                event_log_sequence_number: state.log.len() as u64,
                occurred: Some(occurred),
                event_source_id: event.event_source_id,
                execution_context: execution_context.clone(),
                event_type: event.event_type,
                content: event.content,
                public: event.public,
                ..Default::default()
            };
            state.log.push(committed.clone());
            events.push(committed);
        }

        tracing::debug!(count = events.len(), "In-memory commit");
        Ok(CommitEventsResponse {
            failure: None,
            events,
        })
    }

    async fn commit_for_aggregate(
        &self,
        request: CommitAggregateEventsRequest,
    ) -> Result<CommitAggregateEventsResponse, TransportError> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.take_fault()? {
            return Ok(CommitAggregateEventsResponse {
                failure: Some(failure),
                events: None,
            });
        }
        if let Some(response) = state.scripted_commit_for_aggregate.take() {
            return Ok(response);
        }

        let Some(events) = request.events else {
            return Ok(CommitAggregateEventsResponse {
                failure: invalid_request("Missing aggregate events"),
                events: None,
            });
        };
        let key = match (
            events.event_source_id.decode::<EventSourceId>("event_source_id"),
            events.aggregate_root_id.decode::<AggregateRootId>("aggregate_root_id"),
        ) {
            (Ok(event_source_id), Ok(aggregate_root_id)) => (event_source_id, aggregate_root_id),
            (Err(e), _) | (_, Err(e)) => {
                return Ok(CommitAggregateEventsResponse {
                    failure: invalid_request(e.to_string()),
                    events: None,
                })
            }
        };

        let State { log, streams, .. } = &mut *state;
        let stream = streams.entry(key).or_default();
        let current = stream.len() as u64;
        if current != events.expected_aggregate_root_version {
            let failure = Failure::new(
                AGGREGATE_CONCURRENCY_CONFLICT,
                format!(
                    "Aggregate root {} is at version {}, expected {}",
                    key.1, current, events.expected_aggregate_root_version
                ),
            );
            tracing::debug!(%failure, "In-memory concurrency conflict");
            return Ok(CommitAggregateEventsResponse {
                failure: Some(WireFailure::from(&failure)),
                events: None,
            });
        }

        let execution_context = execution_context_of(request.call_context);
        let occurred = WireTimestamp::from(Utc::now());
        let mut committed = Vec::with_capacity(events.events.len());
        for event in events.events {
            let sequence_number = log.len() as u64;
            log.push(WireCommittedEvent {
                event_log_sequence_number: sequence_number,
                occurred: Some(occurred),
                event_source_id: events.event_source_id.clone(),
                execution_context: execution_context.clone(),
                event_type: event.event_type.clone(),
                content: event.content.clone(),
                public: event.public,
                ..Default::default()
            });
            let aggregate_event = WireCommittedAggregateEvent {
                event_log_sequence_number: sequence_number,
                occurred: Some(occurred),
                execution_context: execution_context.clone(),
                event_type: event.event_type,
                content: event.content,
                public: event.public,
            };
            stream.push(aggregate_event.clone());
            committed.push(aggregate_event);
        }

        Ok(CommitAggregateEventsResponse {
            failure: None,
            events: Some(WireCommittedAggregateEvents {
                event_source_id: events.event_source_id,
                aggregate_root_id: events.aggregate_root_id,
                aggregate_root_version: stream.len() as u64,
                events: committed,
            }),
        })
    }

    async fn fetch_for_aggregate(
        &self,
        request: FetchForAggregateRequest,
    ) -> Result<FetchForAggregateResponse, TransportError> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.take_fault()? {
            return Ok(FetchForAggregateResponse {
                failure: Some(failure),
                events: None,
            });
        }
        if let Some(response) = state.scripted_fetch.take() {
            return Ok(response);
        }

        let Some(aggregate) = request.aggregate else {
            return Ok(FetchForAggregateResponse {
                failure: invalid_request("Missing aggregate"),
                events: None,
            });
        };
        let key = match (
            aggregate.event_source_id.decode::<EventSourceId>("event_source_id"),
            aggregate.aggregate_root_id.decode::<AggregateRootId>("aggregate_root_id"),
        ) {
            (Ok(event_source_id), Ok(aggregate_root_id)) => (event_source_id, aggregate_root_id),
            (Err(e), _) | (_, Err(e)) => {
                return Ok(FetchForAggregateResponse {
                    failure: invalid_request(e.to_string()),
                    events: None,
                })
            }
        };

        let events = state.streams.get(&key).cloned().unwrap_or_default();
        Ok(FetchForAggregateResponse {
            failure: None,
            events: Some(WireCommittedAggregateEvents {
                event_source_id: WireUuid::encode(key.0),
                aggregate_root_id: WireUuid::encode(key.1),
                aggregate_root_version: events.len() as u64,
                events,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{call_context, event_type};
    use quill_domain::{UncommittedAggregateEvent, UncommittedAggregateEvents};
    use quill_eventstore::CommitAggregateEventsRequest;
    use serde_json::json;

    fn request(
        source: EventSourceId,
        root: AggregateRootId,
        expected: u64,
        count: usize,
    ) -> CommitAggregateEventsRequest {
        let event_type = event_type();
        let mut events =
            UncommittedAggregateEvents::new(source, root, AggregateRootVersion::new(expected));
        for i in 0..count {
            events
                .add(UncommittedAggregateEvent::new(json!({ "n": i }), event_type.clone()))
                .unwrap();
        }
        CommitAggregateEventsRequest::new(&call_context(), &events, &Default::default()).unwrap()
    }

    #[tokio::test]
    async fn test_streams_count_versions_and_share_the_log() {
        let store = InMemoryEventStore::new();
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();

        let first = store.commit_for_aggregate(request(source, root, 0, 2)).await.unwrap();
        let second = store.commit_for_aggregate(request(source, root, 2, 1)).await.unwrap();

        assert_eq!(first.events.unwrap().aggregate_root_version, 2);
        let second = second.events.unwrap();
        assert_eq!(second.aggregate_root_version, 3);
        assert_eq!(second.events[0].event_log_sequence_number, 2);
        assert_eq!(store.committed_events().await.len(), 3);
        assert_eq!(store.aggregate_root_version(source, root).await, AggregateRootVersion::new(3));
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_a_conflict() {
        let store = InMemoryEventStore::new();
        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        store.commit_for_aggregate(request(source, root, 0, 1)).await.unwrap();

        let response = store.commit_for_aggregate(request(source, root, 0, 1)).await.unwrap();

        let failure = Failure::try_from(response.failure.unwrap()).unwrap();
        assert_eq!(failure.id, AGGREGATE_CONCURRENCY_CONFLICT);
        assert!(response.events.is_none());
        assert_eq!(store.committed_events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_applies_to_one_call() {
        let store = InMemoryEventStore::new();
        store.disconnect_next().await;

        let source = EventSourceId::generate();
        let root = AggregateRootId::generate();
        assert!(store.commit_for_aggregate(request(source, root, 0, 1)).await.is_err());
        assert!(store.commit_for_aggregate(request(source, root, 0, 1)).await.is_ok());
    }
}
