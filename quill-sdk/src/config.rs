//! Client configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use quill_domain::{ExecutionContext, MicroserviceId, TenantId, Version, DEVELOPMENT_TENANT};

use crate::error::{SdkError, SdkResult};

// =============================================================================
// Configuration
// =============================================================================

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,

    /// Microservice the client runs in
    pub microservice_id: MicroserviceId,

    /// Tenant operations run for unless overridden per call
    pub tenant_id: TenantId,

    /// Version of the microservice
    pub version: Version,

    /// Projection worker configuration
    pub projections: ProjectionsConfig,
}

/// Projection worker configuration.
#[derive(Debug, Clone)]
pub struct ProjectionsConfig {
    /// Fixed delay before registering a projection again
    pub retry_delay_ms: u64,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment
    Test,
    /// Development environment
    Development,
    /// Production environment (JSON logs)
    Production,
}

impl Environment {
    /// Name carried in execution contexts
    pub fn name(&self) -> &'static str {
        match self {
            Environment::Test => "Test",
            Environment::Development => "Development",
            Environment::Production => "Production",
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> SdkResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SdkResult<Self> {
        let environment = Self::load_environment(&lookup)?;
        let microservice_id = Self::load_id(&lookup, "QUILL_MICROSERVICE_ID", Uuid::nil())?;
        let tenant_id = Self::load_id(&lookup, "QUILL_TENANT_ID", DEVELOPMENT_TENANT)?;
        let version = Self::load_version(&lookup)?;
        let projections = Self::load_projections_config(&lookup)?;

        Ok(Self {
            environment,
            microservice_id,
            tenant_id,
            version,
            projections,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            microservice_id: MicroserviceId::generate(),
            tenant_id: TenantId::from(DEVELOPMENT_TENANT),
            version: Version::new(1, 0, 0),
            projections: ProjectionsConfig {
                retry_delay_ms: 10,
            },
        }
    }

    /// Execution context for operations started by this client
    pub fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.microservice_id,
            self.tenant_id,
            self.version.clone(),
            self.environment.name(),
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.projections.retry_delay_ms)
    }

    fn load_environment(lookup: &impl Fn(&str) -> Option<String>) -> SdkResult<Environment> {
        let env_str = lookup("QUILL_ENV").unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(SdkError::Config(format!(
                "Invalid QUILL_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_id<T: From<Uuid>>(
        lookup: &impl Fn(&str) -> Option<String>,
        key: &str,
        default: Uuid,
    ) -> SdkResult<T> {
        match lookup(key) {
            Some(val) => Uuid::from_str(val.trim())
                .map(T::from)
                .map_err(|_| SdkError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(T::from(default)),
        }
    }

    fn load_version(lookup: &impl Fn(&str) -> Option<String>) -> SdkResult<Version> {
        match lookup("QUILL_VERSION") {
            Some(val) => parse_version(&val)
                .ok_or_else(|| SdkError::Config(format!("Invalid QUILL_VERSION: {}", val))),
            None => Ok(Version::new(1, 0, 0)),
        }
    }

    fn load_projections_config(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> SdkResult<ProjectionsConfig> {
        let retry_str = lookup("QUILL_PROJECTION_RETRY_MS").unwrap_or_else(|| "1000".to_string());

        let retry_delay_ms = retry_str.parse::<u64>().map_err(|_| {
            SdkError::Config(format!("Invalid QUILL_PROJECTION_RETRY_MS: {}", retry_str))
        })?;

        Ok(ProjectionsConfig { retry_delay_ms })
    }
}

/// Parse `major.minor.patch`, optionally followed by `-pre_release`
fn parse_version(value: &str) -> Option<Version> {
    let (numbers, pre_release) = match value.trim().split_once('-') {
        Some((numbers, pre_release)) => (numbers, pre_release),
        None => (value.trim(), ""),
    };

    let mut parts = numbers.split('.').map(str::parse::<u32>);
    let version = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => {
            Version::new(major, minor, patch)
        }
        _ => return None,
    };

    Some(Version {
        pre_release: pre_release.to_string(),
        ..version
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            microservice_id: MicroserviceId::from(Uuid::nil()),
            tenant_id: TenantId::from(DEVELOPMENT_TENANT),
            version: Version::new(1, 0, 0),
            projections: ProjectionsConfig {
                retry_delay_ms: 1000,
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.tenant_id, TenantId::from(DEVELOPMENT_TENANT));
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.execution_context().environment, "Test");
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.version, Version::new(1, 0, 0));
        assert_eq!(config.projections.retry_delay_ms, 1000);
    }

    #[test]
    fn test_variables_override_defaults() {
        let tenant = Uuid::new_v4();
        let config = Config::from_lookup(lookup(&[
            ("QUILL_ENV", "prod"),
            ("QUILL_TENANT_ID", &tenant.to_string()),
            ("QUILL_VERSION", "2.3.4-rc1"),
            ("QUILL_PROJECTION_RETRY_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.tenant_id, TenantId::from(tenant));
        assert_eq!(config.version.minor, 3);
        assert_eq!(config.version.pre_release, "rc1");
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("QUILL_ENV", "staging")],
            [("QUILL_MICROSERVICE_ID", "not-a-uuid")],
            [("QUILL_VERSION", "1.2")],
            [("QUILL_PROJECTION_RETRY_MS", "-5")],
        ] {
            assert!(matches!(
                Config::from_lookup(lookup(&vars)),
                Err(SdkError::Config(_))
            ));
        }
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
