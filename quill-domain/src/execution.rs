//! Execution context
//!
//! Carries who is acting, for which tenant, and which correlation a call
//! belongs to. Every outbound request and every committed event holds one.

use crate::identifiers::{MicroserviceId, TenantId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tenant used when running locally
pub const DEVELOPMENT_TENANT: Uuid = Uuid::from_bytes([
    0x44, 0x5f, 0x8e, 0xa8, 0x1a, 0x6f, 0x40, 0xd7, 0xb2, 0xfc, 0x79, 0x6d, 0xba, 0x92, 0xdc, 0x44,
]);

/// Semantic version of the running microservice
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Version {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
    /// Build number
    pub build: u32,
    /// Pre-release label, empty for releases
    pub pre_release: String,
}

impl Version {
    /// Create a release version
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build: 0,
            pre_release: String::new(),
        }
    }

    /// Whether this version carries a pre-release label
    pub fn is_pre_release(&self) -> bool {
        !self.pre_release.is_empty()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_pre_release() {
            write!(f, "-{}.{}", self.pre_release, self.build)?;
        }
        Ok(())
    }
}

/// A single claim about the acting principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim name
    pub key: String,
    /// Claim value
    pub value: String,
    /// Claim value type
    pub value_type: String,
}

/// Context an operation executes in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Originating microservice
    pub microservice_id: MicroserviceId,
    /// Tenant the operation runs for
    pub tenant_id: TenantId,
    /// Version of the originating microservice
    pub version: Version,
    /// Correlation shared by all operations in one causal chain
    pub correlation_id: Uuid,
    /// Claims of the acting principal
    pub claims: Vec<Claim>,
    /// Environment name (e.g. "Development")
    pub environment: String,
}

impl ExecutionContext {
    /// Create an execution context with a fresh correlation
    pub fn new(
        microservice_id: MicroserviceId,
        tenant_id: TenantId,
        version: Version,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            microservice_id,
            tenant_id,
            version,
            correlation_id: Uuid::now_v7(),
            claims: Vec::new(),
            environment: environment.into(),
        }
    }

    /// Same context for another tenant
    pub fn for_tenant(&self, tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            ..self.clone()
        }
    }

    /// Same context with a given correlation
    pub fn for_correlation(&self, correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            ..self.clone()
        }
    }

    /// Same context with extra claims
    pub fn with_claims(mut self, claims: impl IntoIterator<Item = Claim>) -> Self {
        self.claims.extend(claims);
        self
    }
}

/// Context attached to every outbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Execution context of the call
    pub execution_context: ExecutionContext,
    /// Identity of the client process making the call
    pub head_id: Uuid,
}

impl CallContext {
    /// Create a call context
    pub fn new(execution_context: ExecutionContext, head_id: Uuid) -> Self {
        Self {
            execution_context,
            head_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            MicroserviceId::generate(),
            TenantId::from(DEVELOPMENT_TENANT),
            Version::new(1, 2, 3),
            "Development",
        )
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");

        let pre = Version {
            pre_release: "alpha".to_string(),
            build: 7,
            ..Version::new(2, 0, 0)
        };
        assert_eq!(pre.to_string(), "2.0.0-alpha.7");
    }

    #[test]
    fn test_for_tenant_keeps_everything_else() {
        let original = context();
        let tenant = TenantId::generate();
        let switched = original.for_tenant(tenant);

        assert_eq!(switched.tenant_id, tenant);
        assert_eq!(switched.correlation_id, original.correlation_id);
        assert_eq!(switched.microservice_id, original.microservice_id);
    }

    #[test]
    fn test_development_tenant_string() {
        assert_eq!(DEVELOPMENT_TENANT.to_string(), "445f8ea8-1a6f-40d7-b2fc-796dba92dc44");
    }
}
