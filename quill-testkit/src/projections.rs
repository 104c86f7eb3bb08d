//! In-memory projections runtime.
//!
//! Accepts registrations, hands each accepted projection to the test as a
//! [`RuntimeSession`], and serves projection store reads from the states
//! the sessions persisted.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use quill_domain::protocol::{WireCommittedEvent, WireFailure, WireUuid};
use quill_domain::{Failure, TransportError};
use quill_projections::protocol::{
    GetAllRequest, GetAllResponse, GetOneRequest, GetOneResponse, WireProjectionCurrentState,
};
use quill_projections::{
    CurrentStateType, ProjectionId, ProjectionRegistrationRequest, ProjectionRequest,
    ProjectionResponse, ProjectionStoreConnection, ProjectionsConnection, Registration,
    ReverseCall, ScopeId,
};

use crate::event_store::INVALID_REQUEST;
use crate::helpers::stream_event;

type ProjectionKey = (ProjectionId, ScopeId);

#[derive(Default)]
struct Store {
    initial_states: HashMap<ProjectionKey, String>,
    states: HashMap<ProjectionKey, BTreeMap<String, String>>,
    fail_next: Option<Failure>,
    answer_with_key_next: Option<String>,
}

fn projection_key(projection_id: &WireUuid, scope_id: &WireUuid) -> Result<ProjectionKey, String> {
    let projection_id = projection_id.decode("projection_id").map_err(|e| e.to_string())?;
    let scope_id = scope_id.decode("scope_id").map_err(|e| e.to_string())?;
    Ok((projection_id, scope_id))
}

fn invalid_request(reason: String) -> Option<WireFailure> {
    Some(WireFailure::from(&Failure::new(INVALID_REQUEST, reason)))
}

/// The runtime end of one registered projection
pub struct RuntimeSession {
    registration: ProjectionRegistrationRequest,
    key: ProjectionKey,
    requests: mpsc::Sender<ProjectionRequest>,
    responses: mpsc::Receiver<ProjectionResponse>,
    store: Arc<Mutex<Store>>,
}

impl RuntimeSession {
    /// The registration the client sent
    pub fn registration(&self) -> &ProjectionRegistrationRequest {
        &self.registration
    }

    /// Send a request and wait for the answer. `None` once the client
    /// closed the call.
    pub async fn invoke(&mut self, request: ProjectionRequest) -> Option<ProjectionResponse> {
        self.requests.send(request).await.ok()?;
        self.responses.recv().await
    }

    /// Fold an event into the state stored for `key`, persisting the outcome
    /// the way the runtime does
    pub async fn project(
        &mut self,
        key: &str,
        event: WireCommittedEvent,
    ) -> Option<ProjectionResponse> {
        let current = {
            let store = self.store.lock().await;
            match store.states.get(&self.key).and_then(|states| states.get(key)) {
                Some(state) => (CurrentStateType::Persisted, state.clone()),
                None => (
                    CurrentStateType::CreatedFromInitialState,
                    self.registration.initial_state.clone(),
                ),
            }
        };

        let request = ProjectionRequest {
            current_state: Some(WireProjectionCurrentState {
                state_type: current.0,
                key: key.to_string(),
                state: current.1,
            }),
            event: Some(stream_event(event, key)),
            retry_count: 0,
        };
        let response = self.invoke(request).await?;

        let mut store = self.store.lock().await;
        let states = store.states.entry(self.key).or_default();
        match &response {
            ProjectionResponse::Replace { state } => {
                states.insert(key.to_string(), state.clone());
            }
            ProjectionResponse::Delete => {
                states.remove(key);
            }
            ProjectionResponse::Failed { .. } => {}
        }
        Some(response)
    }
}

/// Client end of a session's reverse call
pub struct InMemoryReverseCall {
    requests: mpsc::Receiver<ProjectionRequest>,
    responses: mpsc::Sender<ProjectionResponse>,
}

#[async_trait]
impl ReverseCall for InMemoryReverseCall {
    async fn next_request(&mut self) -> Result<Option<ProjectionRequest>, TransportError> {
        Ok(self.requests.recv().await)
    }

    async fn respond(&mut self, response: ProjectionResponse) -> Result<(), TransportError> {
        self.responses
            .send(response)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Projections runtime held in memory
pub struct InMemoryProjections {
    sessions_tx: mpsc::UnboundedSender<RuntimeSession>,
    sessions_rx: Mutex<mpsc::UnboundedReceiver<RuntimeSession>>,
    registrations: Mutex<Vec<ProjectionRegistrationRequest>>,
    reject_next: Mutex<Option<Failure>>,
    disconnect_next: Mutex<bool>,
    store: Arc<Mutex<Store>>,
}

impl Default for InMemoryProjections {
    fn default() -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        Self {
            sessions_tx,
            sessions_rx: Mutex::new(sessions_rx),
            registrations: Mutex::new(Vec::new()),
            reject_next: Mutex::new(None),
            disconnect_next: Mutex::new(false),
            store: Arc::new(Mutex::new(Store::default())),
        }
    }
}

impl InMemoryProjections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next accepted registration
    pub async fn next_session(&self) -> Option<RuntimeSession> {
        self.sessions_rx.lock().await.recv().await
    }

    /// Every registration received, accepted or not
    pub async fn registrations(&self) -> Vec<ProjectionRegistrationRequest> {
        self.registrations.lock().await.clone()
    }

    /// Reject the next registration with this failure
    pub async fn reject_next_with(&self, failure: Failure) {
        *self.reject_next.lock().await = Some(failure);
    }

    /// Fail the next registration with a transport error
    pub async fn disconnect_next(&self) {
        *self.disconnect_next.lock().await = true;
    }

    /// Persist a state for a key
    pub async fn set_state(
        &self,
        projection_id: ProjectionId,
        scope_id: ScopeId,
        key: &str,
        state: impl Into<String>,
    ) {
        let mut store = self.store.lock().await;
        store
            .states
            .entry((projection_id, scope_id))
            .or_default()
            .insert(key.to_string(), state.into());
    }

    /// Answer the next store read with this failure
    pub async fn fail_next_read_with(&self, failure: Failure) {
        self.store.lock().await.fail_next = Some(failure);
    }

    /// Answer the next single-key read for another key
    pub async fn answer_with_key_next(&self, key: &str) {
        self.store.lock().await.answer_with_key_next = Some(key.to_string());
    }
}

#[async_trait]
impl ProjectionsConnection for InMemoryProjections {
    type Call = InMemoryReverseCall;

    async fn register(
        &self,
        request: ProjectionRegistrationRequest,
    ) -> Result<Registration<Self::Call>, TransportError> {
        if std::mem::take(&mut *self.disconnect_next.lock().await) {
            return Err(TransportError::Unavailable("Simulated disconnect".to_string()));
        }
        self.registrations.lock().await.push(request.clone());
        if let Some(failure) = self.reject_next.lock().await.take() {
            return Ok(Registration::Rejected(failure));
        }

        let key = match projection_key(&request.projection_id, &request.scope_id) {
            Ok(key) => key,
            Err(reason) => return Ok(Registration::Rejected(Failure::new(INVALID_REQUEST, reason))),
        };
        self.store
            .lock()
            .await
            .initial_states
            .insert(key, request.initial_state.clone());

        let (requests_tx, requests_rx) = mpsc::channel(1);
        let (responses_tx, responses_rx) = mpsc::channel(1);
        let session = RuntimeSession {
            registration: request,
            key,
            requests: requests_tx,
            responses: responses_rx,
            store: Arc::clone(&self.store),
        };
        self.sessions_tx
            .send(session)
            .map_err(|_| TransportError::Closed)?;

        tracing::debug!(projection_id = %key.0, "In-memory projection registered");
        Ok(Registration::Accepted(InMemoryReverseCall {
            requests: requests_rx,
            responses: responses_tx,
        }))
    }
}

#[async_trait]
impl ProjectionStoreConnection for InMemoryProjections {
    async fn get_one(&self, request: GetOneRequest) -> Result<GetOneResponse, TransportError> {
        let mut store = self.store.lock().await;
        if let Some(failure) = store.fail_next.take() {
            return Ok(GetOneResponse {
                failure: Some(WireFailure::from(&failure)),
                state: None,
            });
        }
        let key = match projection_key(&request.projection_id, &request.scope_id) {
            Ok(key) => key,
            Err(reason) => {
                return Ok(GetOneResponse {
                    failure: invalid_request(reason),
                    state: None,
                })
            }
        };

        let persisted = store
            .states
            .get(&key)
            .and_then(|states| states.get(&request.key))
            .cloned();
        let (state_type, state) = match persisted {
            Some(state) => (CurrentStateType::Persisted, state),
            None => match store.initial_states.get(&key) {
                Some(initial) => (CurrentStateType::CreatedFromInitialState, initial.clone()),
                None => {
                    return Ok(GetOneResponse {
                        failure: invalid_request(format!("Projection {} is not registered", key.0)),
                        state: None,
                    })
                }
            },
        };

        let answered_key = store.answer_with_key_next.take().unwrap_or(request.key);
        Ok(GetOneResponse {
            failure: None,
            state: Some(WireProjectionCurrentState {
                state_type,
                key: answered_key,
                state,
            }),
        })
    }

    async fn get_all(&self, request: GetAllRequest) -> Result<GetAllResponse, TransportError> {
        let mut store = self.store.lock().await;
        if let Some(failure) = store.fail_next.take() {
            return Ok(GetAllResponse {
                failure: Some(WireFailure::from(&failure)),
                states: Vec::new(),
            });
        }
        let key = match projection_key(&request.projection_id, &request.scope_id) {
            Ok(key) => key,
            Err(reason) => {
                return Ok(GetAllResponse {
                    failure: invalid_request(reason),
                    states: Vec::new(),
                })
            }
        };

        let states = store
            .states
            .get(&key)
            .map(|states| {
                states
                    .iter()
                    .map(|(key, state)| WireProjectionCurrentState {
                        state_type: CurrentStateType::Persisted,
                        key: key.clone(),
                        state: state.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(GetAllResponse {
            failure: None,
            states,
        })
    }
}
