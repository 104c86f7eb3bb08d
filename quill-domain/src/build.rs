//! Build results
//!
//! Registration steps (event types, projections) record what happened here
//! instead of failing on the first problem, so setup can report every
//! problem at once.

use std::fmt;

/// Severity of a build result entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResultKind {
    Information,
    Failure,
}

/// A single build result entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub kind: BuildResultKind,
    pub message: String,
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BuildResultKind::Information => write!(f, "info: {}", self.message),
            BuildResultKind::Failure => write!(f, "failure: {}", self.message),
        }
    }
}

/// Collected results of building client artifacts
#[derive(Debug, Clone, Default)]
pub struct BuildResults {
    results: Vec<BuildResult>,
}

impl BuildResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational entry
    pub fn add_information(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "Build information");
        self.results.push(BuildResult {
            kind: BuildResultKind::Information,
            message,
        });
    }

    /// Record a failure
    pub fn add_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "Build failure");
        self.results.push(BuildResult {
            kind: BuildResultKind::Failure,
            message,
        });
    }

    /// Whether any failure was recorded
    pub fn failed(&self) -> bool {
        self.results.iter().any(|r| r.kind == BuildResultKind::Failure)
    }

    /// Messages of all recorded failures
    pub fn failures(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.kind == BuildResultKind::Failure)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_information_does_not_fail() {
        let mut results = BuildResults::new();
        results.add_information("registered DishPrepared");
        assert!(!results.failed());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_failures_are_collected() {
        let mut results = BuildResults::new();
        results.add_failure("duplicate handler");
        results.add_information("ok");
        results.add_failure("unknown type");

        assert!(results.failed());
        assert_eq!(results.failures(), vec!["duplicate handler", "unknown type"]);
        assert_eq!(results.iter().next().unwrap().to_string(), "failure: duplicate handler");
    }
}
