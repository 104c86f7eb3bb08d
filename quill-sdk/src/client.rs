//! Client and client builder.
//!
//! The builder collects event type registrations and projections, records
//! every problem in one [`BuildResults`], and only hands out a [`Client`]
//! when nothing failed.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use quill_domain::{BuildResults, CallContext, EventType, EventTypes};
use quill_eventstore::{EventStore, EventStoreConnection};
use quill_projections::{
    BuildProjection, ProjectionHandling, ProjectionStore, ProjectionStoreConnection,
    ProjectionsConnection,
};

use crate::config::Config;
use crate::error::{SdkError, SdkResult};
use crate::projection_worker::ProjectionWorker;

// =============================================================================
// Builder
// =============================================================================

/// Builder for a [`Client`]
pub struct ClientBuilder {
    config: Config,
    event_types: EventTypes,
    projections: Vec<Box<dyn BuildProjection>>,
    results: BuildResults,
}

impl ClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            event_types: EventTypes::new(),
            projections: Vec::new(),
            results: BuildResults::new(),
        }
    }

    /// Associate `T` with an event type
    pub fn register_event_type<T>(mut self, event_type: EventType) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        match self.event_types.register::<T>(event_type.clone()) {
            Ok(()) => self.results.add_information(format!(
                "Registered {} as event type {}",
                std::any::type_name::<T>(),
                event_type
            )),
            Err(e) => self.results.add_failure(e.to_string()),
        }
        self
    }

    /// Add a projection, built when the client is built
    pub fn with_projection<B: BuildProjection + 'static>(mut self, projection: B) -> Self {
        self.projections.push(Box::new(projection));
        self
    }

    /// Build the client over the given connections.
    ///
    /// # Errors
    /// Returns `SdkError::Build` with every recorded failure: event types
    /// registered twice, projections that do not build, and projection ids
    /// used more than once.
    pub fn build<E, P>(
        mut self,
        event_store: Arc<E>,
        projections: Arc<P>,
    ) -> SdkResult<Client<E, P>>
    where
        E: EventStoreConnection,
        P: ProjectionsConnection + ProjectionStoreConnection,
    {
        let event_types = Arc::new(self.event_types);
        let mut seen = HashSet::new();
        let mut processors = Vec::with_capacity(self.projections.len());

        for projection in self.projections {
            let projection_id = projection.projection_id();
            if !seen.insert(projection_id) {
                self.results.add_failure(format!(
                    "Projection {} is registered more than once",
                    projection_id
                ));
                continue;
            }
            if let Some(processor) =
                projection.build_processor(Arc::clone(&event_types), &mut self.results)
            {
                processors.push(processor);
            }
        }

        if self.results.failed() {
            return Err(SdkError::Build(self.results.failures()));
        }

        let head_id = Uuid::now_v7();
        let execution_context = self.config.execution_context();
        info!(
            %head_id,
            environment = %self.config.environment,
            event_types = event_types.len(),
            projections = processors.len(),
            "Quill client built"
        );

        Ok(Client {
            event_store: EventStore::new(
                event_store,
                event_types,
                execution_context.clone(),
                head_id,
            ),
            projection_store: ProjectionStore::new(
                Arc::clone(&projections),
                CallContext::new(execution_context.clone(), head_id),
            ),
            projections,
            processors,
            call_context: CallContext::new(execution_context, head_id),
            config: self.config,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Entry point for committing events and running projections
pub struct Client<E, P> {
    config: Config,
    event_store: EventStore<E>,
    projection_store: ProjectionStore<P>,
    projections: Arc<P>,
    processors: Vec<Arc<dyn ProjectionHandling>>,
    call_context: CallContext,
}

impl<E, P> Client<E, P>
where
    E: EventStoreConnection,
    P: ProjectionsConnection + ProjectionStoreConnection + 'static,
{
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_store(&self) -> &EventStore<E> {
        &self.event_store
    }

    pub fn projection_store(&self) -> &ProjectionStore<P> {
        &self.projection_store
    }

    /// Start one worker per projection.
    ///
    /// Workers run until `shutdown` is cancelled.
    pub fn spawn_projections(
        &self,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<SdkResult<()>>> {
        self.processors
            .iter()
            .map(|processor| {
                let worker = ProjectionWorker::new(
                    Arc::clone(&self.projections),
                    Arc::clone(processor),
                    self.call_context.clone(),
                    self.config.retry_delay(),
                );
                tokio::spawn(worker.run(shutdown.clone()))
            })
            .collect()
    }
}
