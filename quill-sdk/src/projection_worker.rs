//! Projection worker: registers a projection and answers the runtime's
//! requests over the reverse call.
//!
//! A session lasts from registration until the call is lost, rejected, or a
//! fatal projection error occurs. The worker then waits a fixed delay and
//! registers again, until shutdown is signaled.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use quill_domain::{CallContext, Failure, TransportError};
use quill_projections::{
    ProjectionError, ProjectionHandling, ProjectionResponse, ProjectionsConnection, Registration,
    ReverseCall,
};

use crate::error::SdkResult;

/// Why a session ended
#[derive(Debug, Error)]
enum SessionEnded {
    #[error("registration could not be built: {0}")]
    Registration(ProjectionError),

    #[error("registration rejected: {0}")]
    Rejected(Failure),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("runtime closed the reverse call")]
    Closed,

    #[error("fatal projection error: {0}")]
    Fatal(ProjectionError),
}

/// Projection worker.
pub struct ProjectionWorker<P> {
    connection: Arc<P>,
    processor: Arc<dyn ProjectionHandling>,
    call_context: CallContext,
    retry_delay: Duration,
}

impl<P: ProjectionsConnection> ProjectionWorker<P> {
    /// Create a new projection worker.
    pub fn new(
        connection: Arc<P>,
        processor: Arc<dyn ProjectionHandling>,
        call_context: CallContext,
        retry_delay: Duration,
    ) -> Self {
        Self {
            connection,
            processor,
            call_context,
            retry_delay,
        }
    }

    /// Run the projection worker loop.
    ///
    /// Returns when shutdown is signaled via cancellation token.
    pub async fn run(self, shutdown: CancellationToken) -> SdkResult<()> {
        let projection_id = self.processor.projection_id();
        info!(
            %projection_id,
            retry_delay_ms = self.retry_delay.as_millis() as u64,
            "Projection worker started"
        );

        loop {
            let ended = tokio::select! {
                _ = shutdown.cancelled() => break,
                ended = self.session() => ended,
            };
            error!(%projection_id, reason = %ended, "Projection session ended (will re-register)");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }

        info!(%projection_id, "Projection worker stopped");
        Ok(())
    }

    /// Register and answer requests until the session ends.
    async fn session(&self) -> SessionEnded {
        let projection_id = self.processor.projection_id();
        let request = match self.processor.registration_request(&self.call_context) {
            Ok(request) => request,
            Err(e) => return SessionEnded::Registration(e),
        };

        let mut call = match self.connection.register(request).await {
            Ok(Registration::Accepted(call)) => call,
            Ok(Registration::Rejected(failure)) => return SessionEnded::Rejected(failure),
            Err(e) => return e.into(),
        };
        info!(%projection_id, "Projection registered");

        loop {
            let request = match call.next_request().await {
                Ok(Some(request)) => request,
                Ok(None) => return SessionEnded::Closed,
                Err(e) => return e.into(),
            };
            let retry_count = request.retry_count;

            let (response, fatal) = match self.processor.handle(request) {
                Ok(response) => (response, None),
                Err(e) => {
                    warn!(%projection_id, retry_count, error = %e, "Projection request failed");
                    let response = ProjectionResponse::Failed {
                        reason: e.to_string(),
                        retry: true,
                    };
                    (response, e.is_fatal().then_some(e))
                }
            };

            if let Err(e) = call.respond(response).await {
                return e.into();
            }
            if let Some(e) = fatal {
                return SessionEnded::Fatal(e);
            }
            debug!(%projection_id, "Projection request answered");
        }
    }
}
