//! Projection builder
//!
//! Collects handlers, then resolves event types and checks for duplicates
//! in one pass. Problems are recorded in [`BuildResults`] so that every
//! projection can report its problems before the client starts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use quill_domain::{BuildResults, ContentType, EventType, EventTypes};

use crate::context::ProjectionContext;
use crate::identifiers::{ProjectionId, ScopeId};
use crate::key_selector::KeySelector;
use crate::outcome::ProjectionOutcome;
use crate::projection::{typed_handler, Projection, ProjectionEventHandler, ProjectionHandler};

enum HandlerEventType {
    Explicit(EventType),
    Inferred(ContentType),
}

type MakeHandler<R> = Box<dyn FnOnce(EventType) -> ProjectionHandler<R> + Send>;

struct PendingHandler<R> {
    event_type: HandlerEventType,
    key_selector: KeySelector,
    make: MakeHandler<R>,
}

/// Builder for a [`Projection`]
pub struct ProjectionBuilder<R> {
    projection_id: ProjectionId,
    scope_id: ScopeId,
    initial_state: Option<R>,
    handlers: Vec<PendingHandler<R>>,
}

impl<R> ProjectionBuilder<R>
where
    R: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Start a projection in the default scope, with `R::default()` as
    /// initial state
    pub fn new(projection_id: ProjectionId) -> Self {
        Self {
            projection_id,
            scope_id: ScopeId::DEFAULT,
            initial_state: None,
            handlers: Vec::new(),
        }
    }

    pub fn projection_id(&self) -> ProjectionId {
        self.projection_id
    }

    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        self.scope_id = scope_id;
        self
    }

    pub fn with_initial_state(mut self, initial_state: R) -> Self {
        self.initial_state = Some(initial_state);
        self
    }

    /// Handle events of an explicit event type
    pub fn on<E, F>(mut self, event_type: EventType, key_selector: KeySelector, handler: F) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
        F: Fn(R, &E, &ProjectionContext) -> ProjectionOutcome<R> + Send + Sync + 'static,
    {
        self.handlers.push(PendingHandler {
            event_type: HandlerEventType::Explicit(event_type),
            key_selector,
            make: Box::new(move |event_type| typed_handler::<R, E, F>(event_type, handler)),
        });
        self
    }

    /// Handle events whose event type is registered for `E`
    pub fn on_type<E, F>(mut self, key_selector: KeySelector, handler: F) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
        F: Fn(R, &E, &ProjectionContext) -> ProjectionOutcome<R> + Send + Sync + 'static,
    {
        self.handlers.push(PendingHandler {
            event_type: HandlerEventType::Inferred(ContentType::of::<E>()),
            key_selector,
            make: Box::new(move |event_type| typed_handler::<R, E, F>(event_type, handler)),
        });
        self
    }

    /// Build the projection.
    ///
    /// Returns `None` if any failure was recorded: an event type that cannot
    /// be resolved, an event type handled twice, or no handlers at all.
    pub fn build(
        self,
        event_types: &EventTypes,
        results: &mut BuildResults,
    ) -> Option<Projection<R>> {
        let projection_id = self.projection_id;
        let mut events: HashMap<EventType, ProjectionEventHandler<R>> = HashMap::new();
        let mut failed = false;

        for pending in self.handlers {
            let event_type = match pending.event_type {
                HandlerEventType::Explicit(event_type) => event_type,
                HandlerEventType::Inferred(content_type) => {
                    match event_types.resolve(&content_type) {
                        Ok(event_type) => event_type,
                        Err(e) => {
                            results.add_failure(format!("Projection {}: {}", projection_id, e));
                            failed = true;
                            continue;
                        }
                    }
                }
            };

            if events.contains_key(&event_type) {
                results.add_failure(format!(
                    "Projection {} handles event type {} more than once",
                    projection_id, event_type
                ));
                failed = true;
                continue;
            }

            let handler = (pending.make)(event_type.clone());
            events.insert(
                event_type,
                ProjectionEventHandler {
                    key_selector: pending.key_selector,
                    handler,
                },
            );
        }

        if events.is_empty() && !failed {
            results.add_failure(format!("Projection {} has no event handlers", projection_id));
            failed = true;
        }
        if failed {
            return None;
        }

        results.add_information(format!(
            "Built projection {} handling {} event types",
            projection_id,
            events.len()
        ));
        Some(Projection::new(
            projection_id,
            self.scope_id,
            self.initial_state.unwrap_or_default(),
            events,
        ))
    }
}
