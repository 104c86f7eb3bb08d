//! Quill Projections
//!
//! Folds events into keyed read models. This is the read side: the runtime
//! streams events to a registered projection, the processor applies the
//! matching handler, and the runtime persists the resulting state.
//!
//! # Components
//!
//! - **Builder**: declares handlers per event type with a key selector
//! - **Processor**: answers one projection request at a time
//! - **Store**: reads persisted read model state
//! - **Connection**: ports for registration, reverse calls and state reads

#![warn(clippy::all)]

pub mod builder;
pub mod connection;
pub mod context;
pub mod error;
pub mod identifiers;
pub mod key_selector;
pub mod outcome;
pub mod processor;
pub mod projection;
pub mod protocol;
pub mod store;

pub use builder::ProjectionBuilder;
pub use connection::{ProjectionStoreConnection, ProjectionsConnection, Registration, ReverseCall};
pub use context::{EventContext, ProjectionContext};
pub use error::{ProjectionError, Result};
pub use identifiers::{Key, PartitionId, ProjectionId, ScopeId};
pub use key_selector::KeySelector;
pub use outcome::ProjectionOutcome;
pub use processor::{BuildProjection, ProjectionHandling, ProjectionProcessor};
pub use projection::{Projection, ProjectionEventHandler, ProjectionHandler};
pub use protocol::{
    CurrentState, CurrentStateType, ProjectionRegistrationRequest, ProjectionRegistrationResponse,
    ProjectionRequest, ProjectionResponse,
};
pub use store::ProjectionStore;
