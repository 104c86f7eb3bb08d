//! Integration tests for projection folding and the projection store.
//!
//! Folds events through a built projection the way the runtime invokes it,
//! and reads state back through the in-memory projections runtime.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use quill_domain::{BuildResults, EventSourceId, EventType, EventTypes, Failure};
use quill_projections::{
    BuildProjection, CurrentStateType, Key, KeySelector, ProjectionBuilder, ProjectionError,
    ProjectionHandling, ProjectionId, ProjectionOutcome, ProjectionResponse, ProjectionStore,
    ProjectionsConnection, Registration, ScopeId,
};
use quill_testkit::{
    call_context, committed_event, event_type, projection_request, InMemoryProjections,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Chef {
    name: String,
    dishes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DishPrepared {
    dish: String,
    chef: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChefFired {
    chef: String,
}

struct Fixture {
    projection_id: ProjectionId,
    dish_prepared: EventType,
    chef_fired: EventType,
    event_types: Arc<EventTypes>,
}

fn fixture() -> Fixture {
    let dish_prepared = event_type();
    let chef_fired = event_type();
    let mut event_types = EventTypes::new();
    event_types.register::<DishPrepared>(dish_prepared.clone()).unwrap();
    event_types.register::<ChefFired>(chef_fired.clone()).unwrap();

    Fixture {
        projection_id: ProjectionId::generate(),
        dish_prepared,
        chef_fired,
        event_types: Arc::new(event_types),
    }
}

fn chefs(projection_id: ProjectionId) -> ProjectionBuilder<Chef> {
    ProjectionBuilder::<Chef>::new(projection_id)
        .on_type::<DishPrepared, _>(
            KeySelector::Property("chef".to_string()),
            |mut chef, event, _| {
                chef.name = event.chef.clone();
                chef.dishes.push(event.dish.clone());
                ProjectionOutcome::Replace(chef)
            },
        )
        .on_type::<ChefFired, _>(KeySelector::Property("chef".to_string()), |_, _, _| {
            ProjectionOutcome::Delete
        })
}

fn processor(fixture: &Fixture) -> Arc<dyn ProjectionHandling> {
    let mut results = BuildResults::new();
    let processor = Box::new(chefs(fixture.projection_id))
        .build_processor(Arc::clone(&fixture.event_types), &mut results)
        .unwrap();
    assert!(!results.failed());
    processor
}

fn replaced(response: ProjectionResponse) -> String {
    match response {
        ProjectionResponse::Replace { state } => state,
        other => panic!("expected a replace, got {other:?}"),
    }
}

// =============================================================================
// Folding
// =============================================================================

#[test]
fn test_folding_a_stream_of_events() {
    let fixture = fixture();
    let processor = processor(&fixture);
    let source = EventSourceId::generate();

    let first = committed_event(
        0,
        source,
        &fixture.dish_prepared,
        json!({"dish": "Taco", "chef": "Mr. Taco"}),
    );
    let second = committed_event(
        1,
        source,
        &fixture.dish_prepared,
        json!({"dish": "Burrito", "chef": "Mr. Taco"}),
    );

    let state = replaced(
        processor
            .handle(projection_request(&first, "Mr. Taco", None, r#"{"name":"","dishes":[]}"#))
            .unwrap(),
    );
    let state = replaced(
        processor
            .handle(projection_request(&second, "Mr. Taco", Some(state.as_str()), "{}"))
            .unwrap(),
    );

    let chef: Chef = serde_json::from_str(&state).unwrap();
    assert_eq!(
        chef,
        Chef {
            name: "Mr. Taco".to_string(),
            dishes: vec!["Taco".to_string(), "Burrito".to_string()],
        }
    );
}

#[test]
fn test_delete_outcome() {
    let fixture = fixture();
    let processor = processor(&fixture);
    let fired = committed_event(
        4,
        EventSourceId::generate(),
        &fixture.chef_fired,
        json!({"chef": "Mr. Taco"}),
    );

    let response = processor
        .handle(projection_request(
            &fired,
            "Mr. Taco",
            Some(r#"{"name":"Mr. Taco","dishes":[]}"#),
            "{}",
        ))
        .unwrap();

    assert_eq!(response, ProjectionResponse::Delete);
}

#[test]
fn test_content_the_registry_rejects_is_a_protocol_error() {
    let fixture = fixture();
    let processor = processor(&fixture);
    let malformed = committed_event(
        0,
        EventSourceId::generate(),
        &fixture.dish_prepared,
        json!({"dish": 42}),
    );

    let error = processor
        .handle(projection_request(&malformed, "Mr. Taco", None, "{}"))
        .unwrap_err();

    assert!(matches!(error, ProjectionError::Protocol(_)));
    assert!(!error.is_fatal());
}

#[test]
fn test_registration_lists_every_handled_event_type() {
    let fixture = fixture();
    let processor = processor(&fixture);

    let request = processor.registration_request(&call_context()).unwrap();

    assert_eq!(request.events.len(), 2);
    assert_eq!(request.initial_state, r#"{"name":"","dishes":[]}"#);
    assert!(request
        .events
        .iter()
        .all(|selector| selector.key_selector.expression == "chef"));
}

// =============================================================================
// Projection store
// =============================================================================

async fn registered_store(
    fixture: &Fixture,
) -> (Arc<InMemoryProjections>, ProjectionStore<InMemoryProjections>) {
    let runtime = Arc::new(InMemoryProjections::new());
    let registration = processor(fixture).registration_request(&call_context()).unwrap();
    let accepted = runtime.register(registration).await.unwrap();
    assert!(matches!(accepted, Registration::Accepted(_)));

    let store = ProjectionStore::new(Arc::clone(&runtime), call_context());
    (runtime, store)
}

#[tokio::test]
async fn test_get_unknown_key_returns_initial_state() {
    let fixture = fixture();
    let (_runtime, store) = registered_store(&fixture).await;

    let current = store
        .get::<Chef>(
            &Key::from("Mr. Taco"),
            fixture.projection_id,
            ScopeId::DEFAULT,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(current.state_type, CurrentStateType::CreatedFromInitialState);
    assert_eq!(current.state, Chef::default());
}

#[tokio::test]
async fn test_get_persisted_state() -> anyhow::Result<()> {
    let fixture = fixture();
    let (runtime, store) = registered_store(&fixture).await;
    runtime
        .set_state(
            fixture.projection_id,
            ScopeId::DEFAULT,
            "Mr. Taco",
            r#"{"name":"Mr. Taco","dishes":["Taco"]}"#,
        )
        .await;

    let chef: Chef = store
        .get_state(
            &Key::from("Mr. Taco"),
            fixture.projection_id,
            ScopeId::DEFAULT,
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(chef.dishes, vec!["Taco"]);
    Ok(())
}

#[tokio::test]
async fn test_get_answered_for_other_key_is_rejected() {
    let fixture = fixture();
    let (runtime, store) = registered_store(&fixture).await;
    runtime.answer_with_key_next("Mrs. Burrito").await;

    let result = store
        .get::<Chef>(
            &Key::from("Mr. Taco"),
            fixture.projection_id,
            ScopeId::DEFAULT,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(
        result.unwrap_err(),
        ProjectionError::WrongKeyReceived {
            requested: Key::from("Mr. Taco"),
            received: Key::from("Mrs. Burrito"),
        }
    );
}

#[tokio::test]
async fn test_get_failure_is_an_error() {
    let fixture = fixture();
    let (runtime, store) = registered_store(&fixture).await;
    let failure = Failure::new(Uuid::now_v7(), "Projection store unavailable");
    runtime.fail_next_read_with(failure.clone()).await;

    let result = store
        .get::<Chef>(
            &Key::from("Mr. Taco"),
            fixture.projection_id,
            ScopeId::DEFAULT,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.unwrap_err(), ProjectionError::Failure(failure));
}

#[tokio::test]
async fn test_get_all_returns_persisted_states_by_key() {
    let fixture = fixture();
    let (runtime, store) = registered_store(&fixture).await;
    for (key, state) in [
        ("Mrs. Burrito", r#"{"name":"Mrs. Burrito","dishes":["Burrito"]}"#),
        ("Mr. Taco", r#"{"name":"Mr. Taco","dishes":["Taco"]}"#),
    ] {
        runtime
            .set_state(fixture.projection_id, ScopeId::DEFAULT, key, state)
            .await;
    }

    let states = store
        .get_all::<Chef>(fixture.projection_id, ScopeId::DEFAULT, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<&str> = states.iter().map(|current| current.state.name.as_str()).collect();
    assert_eq!(names, vec!["Mr. Taco", "Mrs. Burrito"]);
    assert!(states
        .iter()
        .all(|current| current.state_type == CurrentStateType::Persisted));
}

#[tokio::test]
async fn test_cancelled_read_is_rejected() {
    let fixture = fixture();
    let (_runtime, store) = registered_store(&fixture).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = store
        .get::<Chef>(&Key::from("Mr. Taco"), fixture.projection_id, ScopeId::DEFAULT, &cancel)
        .await;

    assert_eq!(result.unwrap_err(), ProjectionError::Cancelled);
}
