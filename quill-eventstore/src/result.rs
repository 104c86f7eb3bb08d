//! Commit results
//!
//! A commit either produces committed events or a failure from the runtime.
//! Both are ordinary outcomes.

use quill_domain::{CommittedAggregateEvents, CommittedEvents, Failure};

/// Outcome of committing events
#[derive(Debug, Clone, PartialEq)]
pub struct CommitEventsResult {
    events: CommittedEvents,
    failure: Option<Failure>,
}

impl CommitEventsResult {
    pub fn committed(events: CommittedEvents) -> Self {
        Self {
            events,
            failure: None,
        }
    }

    pub fn failed_with(failure: Failure) -> Self {
        Self {
            events: CommittedEvents::default(),
            failure: Some(failure),
        }
    }

    /// Whether the runtime rejected the commit
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Committed events; empty when the commit failed
    pub fn events(&self) -> &CommittedEvents {
        &self.events
    }

    pub fn into_events(self) -> CommittedEvents {
        self.events
    }
}

/// Outcome of committing aggregate events
#[derive(Debug, Clone, PartialEq)]
pub struct CommitAggregateEventsResult {
    events: CommittedAggregateEvents,
    failure: Option<Failure>,
}

impl CommitAggregateEventsResult {
    pub fn committed(events: CommittedAggregateEvents) -> Self {
        Self {
            events,
            failure: None,
        }
    }

    /// A failed commit. `events` is the empty sequence for the aggregate.
    pub fn failed_with(events: CommittedAggregateEvents, failure: Failure) -> Self {
        Self {
            events,
            failure: Some(failure),
        }
    }

    /// Whether the runtime rejected the commit
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Committed events; empty when the commit failed
    pub fn events(&self) -> &CommittedAggregateEvents {
        &self.events
    }

    pub fn into_events(self) -> CommittedAggregateEvents {
        self.events
    }
}
