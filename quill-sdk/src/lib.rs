//! Quill SDK
//!
//! Application-facing entry point. Wires the event type registry, the event
//! store client and projections over caller-supplied connections.
//!
//! # Usage
//!
//! ```ignore
//! let config = Config::from_env()?;
//! quill_sdk::telemetry::init(config.environment)?;
//!
//! let client = ClientBuilder::new(config)
//!     .register_event_type::<DishPrepared>(dish_prepared)
//!     .with_projection(chefs)
//!     .build(event_store_connection, projections_connection)?;
//!
//! let workers = client.spawn_projections(shutdown.clone());
//! ```
//!
//! # Environment Variables
//!
//! - `QUILL_ENV`: Environment (test, development, production)
//! - `QUILL_MICROSERVICE_ID`: Microservice id (default: nil uuid)
//! - `QUILL_TENANT_ID`: Tenant id (default: development tenant)
//! - `QUILL_VERSION`: Microservice version, `major.minor.patch[-pre]` (default: 1.0.0)
//! - `QUILL_PROJECTION_RETRY_MS`: Projection re-registration delay (default: 1000)

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod projection_worker;
pub mod telemetry;

// Re-exports for convenience
pub use client::{Client, ClientBuilder};
pub use config::{Config, Environment, ProjectionsConfig};
pub use error::{SdkError, SdkResult};
pub use projection_worker::ProjectionWorker;
