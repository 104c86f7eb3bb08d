//! SDK error types.

use quill_eventstore::EventStoreError;
use quill_projections::ProjectionError;
use thiserror::Error;

/// SDK-level errors.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The client could not be built; one entry per recorded failure
    #[error("Client build failed: {}", .0.join("; "))]
    Build(Vec<String>),

    /// Event store error
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Projection error
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;
