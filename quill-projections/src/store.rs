//! Projection store
//!
//! Reads persisted read model state for a projection. Keys that were never
//! projected come back holding the projection's initial state.

use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quill_domain::protocol::{WireCallContext, WireFailure, WireUuid};
use quill_domain::{CallContext, Failure, TenantId, TransportError};

use crate::connection::ProjectionStoreConnection;
use crate::error::{ProjectionError, Result};
use crate::identifiers::{Key, ProjectionId, ScopeId};
use crate::protocol::{CurrentState, GetAllRequest, GetOneRequest};

/// Client for reading projection state
pub struct ProjectionStore<C> {
    connection: Arc<C>,
    call_context: CallContext,
}

impl<C> Clone for ProjectionStore<C> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            call_context: self.call_context.clone(),
        }
    }
}

impl<C: ProjectionStoreConnection> ProjectionStore<C> {
    pub fn new(connection: Arc<C>, call_context: CallContext) -> Self {
        Self {
            connection,
            call_context,
        }
    }

    /// Same store, reading for another tenant
    pub fn for_tenant(&self, tenant_id: TenantId) -> Self {
        let mut store = self.clone();
        store.call_context.execution_context =
            self.call_context.execution_context.for_tenant(tenant_id);
        store
    }

    /// Get the state of one read model instance.
    ///
    /// # Errors
    /// Returns `ProjectionError::WrongKeyReceived` if the runtime answers for
    /// another key, `ProjectionError::Failure` for a runtime failure.
    pub async fn get<R: DeserializeOwned>(
        &self,
        key: &Key,
        projection_id: ProjectionId,
        scope_id: ScopeId,
        cancel: &CancellationToken,
    ) -> Result<CurrentState<R>> {
        debug!(%projection_id, %scope_id, %key, "Getting projection state");
        let request = GetOneRequest {
            call_context: Some(WireCallContext::from(&self.call_context)),
            projection_id: WireUuid::encode(projection_id),
            scope_id: WireUuid::encode(scope_id),
            key: key.to_string(),
        };

        let response = cancellable(cancel, self.connection.get_one(request)).await?;
        check_failure(response.failure)?;

        let state = response.state.ok_or(ProjectionError::MissingCurrentState)?;
        if state.key != key.as_str() {
            let received = Key::from(state.key);
            warn!(
                %projection_id,
                requested = %key,
                %received,
                "Projection store returned wrong key"
            );
            return Err(ProjectionError::WrongKeyReceived {
                requested: key.clone(),
                received,
            });
        }
        CurrentState::decode(state)
    }

    /// Get only the state of one read model instance
    ///
    /// # Errors
    /// See [`ProjectionStore::get`].
    pub async fn get_state<R: DeserializeOwned>(
        &self,
        key: &Key,
        projection_id: ProjectionId,
        scope_id: ScopeId,
        cancel: &CancellationToken,
    ) -> Result<R> {
        Ok(self.get(key, projection_id, scope_id, cancel).await?.state)
    }

    /// Get the state of every persisted read model instance.
    ///
    /// # Errors
    /// Returns `ProjectionError::Failure` for a runtime failure, or the
    /// first state that does not decode.
    pub async fn get_all<R: DeserializeOwned>(
        &self,
        projection_id: ProjectionId,
        scope_id: ScopeId,
        cancel: &CancellationToken,
    ) -> Result<Vec<CurrentState<R>>> {
        debug!(%projection_id, %scope_id, "Getting all projection states");
        let request = GetAllRequest {
            call_context: Some(WireCallContext::from(&self.call_context)),
            projection_id: WireUuid::encode(projection_id),
            scope_id: WireUuid::encode(scope_id),
        };

        let response = cancellable(cancel, self.connection.get_all(request)).await?;
        check_failure(response.failure)?;

        response.states.into_iter().map(CurrentState::decode).collect()
    }
}

fn check_failure(failure: Option<WireFailure>) -> Result<()> {
    match failure {
        Some(failure) => {
            let failure = Failure::try_from(failure)?;
            warn!(failure = %failure, "Projection store failure");
            Err(ProjectionError::Failure(failure))
        }
        None => Ok(()),
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProjectionError::Cancelled),
        result = call => Ok(result?),
    }
}
