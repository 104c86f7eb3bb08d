//! Projection handler outcomes

/// What a handler did to a read model instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionOutcome<R> {
    /// Replace the stored state
    Replace(R),
    /// Delete the read model instance
    Delete,
}

impl<R> ProjectionOutcome<R> {
    pub fn is_delete(&self) -> bool {
        matches!(self, ProjectionOutcome::Delete)
    }
}

impl<R> From<R> for ProjectionOutcome<R> {
    fn from(state: R) -> Self {
        ProjectionOutcome::Replace(state)
    }
}
