//! Transport errors shared by every connection port

/// A call could not be completed by the transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The runtime could not be reached
    #[error("Runtime unavailable: {0}")]
    Unavailable(String),

    /// The call started but did not complete
    #[error("Call failed: {0}")]
    CallFailed(String),

    /// The runtime closed a long-lived call
    #[error("Call closed by runtime")]
    Closed,
}
