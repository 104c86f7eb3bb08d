//! Projection connection ports
//!
//! Projections are registered once and then driven by the runtime over a
//! reverse call: the runtime sends requests and the client answers each one.

use async_trait::async_trait;

use quill_domain::{Failure, TransportError};

use crate::protocol::{
    GetAllRequest, GetAllResponse, GetOneRequest, GetOneResponse, ProjectionRegistrationRequest,
    ProjectionRequest, ProjectionResponse,
};

/// Outcome of registering a projection
#[derive(Debug)]
pub enum Registration<C> {
    /// The runtime accepted the projection and opened a reverse call
    Accepted(C),
    /// The runtime refused the projection
    Rejected(Failure),
}

/// An open reverse call for one registered projection
#[async_trait]
pub trait ReverseCall: Send {
    /// Next request from the runtime, or `None` once the runtime closed the call
    async fn next_request(&mut self) -> Result<Option<ProjectionRequest>, TransportError>;

    /// Answer the last request
    async fn respond(&mut self, response: ProjectionResponse) -> Result<(), TransportError>;
}

/// Port for registering projections.
///
/// Implementations:
/// - `InMemoryProjections` (quill-testkit) - reverse calls over channels
#[async_trait]
pub trait ProjectionsConnection: Send + Sync {
    type Call: ReverseCall + 'static;

    async fn register(
        &self,
        request: ProjectionRegistrationRequest,
    ) -> Result<Registration<Self::Call>, TransportError>;
}

/// Port for reading projection state
#[async_trait]
pub trait ProjectionStoreConnection: Send + Sync {
    async fn get_one(&self, request: GetOneRequest) -> Result<GetOneResponse, TransportError>;

    async fn get_all(&self, request: GetAllRequest) -> Result<GetAllResponse, TransportError>;
}
