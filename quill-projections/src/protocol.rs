//! Projection wire protocol
//!
//! Registration, invocation and projection store messages. Read model state
//! travels as JSON text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use quill_domain::protocol::{
    WireCallContext, WireCommittedEvent, WireEventType, WireFailure, WireUuid,
};

use crate::error::{ProjectionError, Result};
use crate::identifiers::Key;
use crate::key_selector::WireKeySelector;

// =============================================================================
// Current state
// =============================================================================

/// Where a read model state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentStateType {
    /// No state was persisted for the key; this is the initial state
    CreatedFromInitialState,
    /// The state was persisted by an earlier invocation
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProjectionCurrentState {
    pub state_type: CurrentStateType,
    pub key: String,
    pub state: String,
}

/// A decoded read model state
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentState<R> {
    pub state_type: CurrentStateType,
    pub key: Key,
    pub state: R,
}

impl<R: DeserializeOwned> CurrentState<R> {
    /// # Errors
    /// Returns `ProjectionError::InvalidState` if the state JSON is not an `R`.
    pub fn decode(wire: WireProjectionCurrentState) -> Result<Self> {
        let state = serde_json::from_str(&wire.state)
            .map_err(|e| ProjectionError::InvalidState(e.to_string()))?;
        Ok(Self {
            state_type: wire.state_type,
            key: Key::from(wire.key),
            state,
        })
    }
}

impl<R: Serialize> CurrentState<R> {
    /// # Errors
    /// Returns `ProjectionError::InvalidState` if the state does not serialize.
    pub fn encode(&self) -> Result<WireProjectionCurrentState> {
        Ok(WireProjectionCurrentState {
            state_type: self.state_type,
            key: self.key.to_string(),
            state: encode_state(&self.state)?,
        })
    }
}

pub(crate) fn encode_state<R: Serialize>(state: &R) -> Result<String> {
    serde_json::to_string(state).map_err(|e| ProjectionError::InvalidState(e.to_string()))
}

// =============================================================================
// Registration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProjectionEventSelector {
    pub event_type: WireEventType,
    pub key_selector: WireKeySelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionRegistrationRequest {
    pub call_context: Option<WireCallContext>,
    pub projection_id: WireUuid,
    pub scope_id: WireUuid,
    pub initial_state: String,
    pub events: Vec<WireProjectionEventSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionRegistrationResponse {
    pub failure: Option<WireFailure>,
}

// =============================================================================
// Invocation
// =============================================================================

/// An event read from a stream, with the partition it was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStreamEvent {
    pub event: Option<WireCommittedEvent>,
    pub partition_id: String,
    pub scope_id: WireUuid,
}

/// The runtime asks the projection to fold one event into one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub current_state: Option<WireProjectionCurrentState>,
    pub event: Option<WireStreamEvent>,
    pub retry_count: u32,
}

/// Answer to a [`ProjectionRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionResponse {
    /// Persist this state for the key
    Replace { state: String },
    /// Delete the read model instance for the key
    Delete,
    /// Processing failed; the runtime may retry
    Failed { reason: String, retry: bool },
}

// =============================================================================
// Projection store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOneRequest {
    pub call_context: Option<WireCallContext>,
    pub projection_id: WireUuid,
    pub scope_id: WireUuid,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOneResponse {
    pub failure: Option<WireFailure>,
    pub state: Option<WireProjectionCurrentState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllRequest {
    pub call_context: Option<WireCallContext>,
    pub projection_id: WireUuid,
    pub scope_id: WireUuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAllResponse {
    pub failure: Option<WireFailure>,
    pub states: Vec<WireProjectionCurrentState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Chef {
        name: String,
        dishes: Vec<String>,
    }

    #[test]
    fn test_current_state_decodes_typed_state() {
        let wire = WireProjectionCurrentState {
            state_type: CurrentStateType::Persisted,
            key: "Mr. Taco".to_string(),
            state: r#"{"name":"Mr. Taco","dishes":["Taco"]}"#.to_string(),
        };

        let state = CurrentState::<Chef>::decode(wire.clone()).unwrap();
        assert_eq!(state.key, Key::from("Mr. Taco"));
        assert_eq!(state.state.dishes, vec!["Taco"]);
        assert_eq!(state.encode().unwrap(), wire);
    }

    #[test]
    fn test_current_state_rejects_wrong_shape() {
        let wire = WireProjectionCurrentState {
            state_type: CurrentStateType::CreatedFromInitialState,
            key: "k".to_string(),
            state: r#"{"unexpected":true}"#.to_string(),
        };

        assert!(matches!(
            CurrentState::<Chef>::decode(wire),
            Err(ProjectionError::InvalidState(_))
        ));
    }
}
