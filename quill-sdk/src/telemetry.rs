//! Tracing initialisation.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Environment;
use crate::error::{SdkError, SdkResult};

/// Install the global subscriber.
///
/// Production writes JSON lines; other environments write human-readable
/// output. `RUST_LOG` is honoured on top of the default `quill=info`.
///
/// # Errors
/// Returns `SdkError::Config` if a subscriber is already installed.
pub fn init(environment: Environment) -> SdkResult<()> {
    let json = environment == Environment::Production;
    let directive = "quill=info"
        .parse()
        .map_err(|e| SdkError::Config(format!("Invalid log directive: {}", e)))?;

    tracing_subscriber::registry()
        .with((!json).then(fmt::layer))
        .with(json.then(|| fmt::layer().json()))
        .with(EnvFilter::from_default_env().add_directive(directive))
        .try_init()
        .map_err(|e| SdkError::Config(format!("Tracing already initialised: {}", e)))
}
