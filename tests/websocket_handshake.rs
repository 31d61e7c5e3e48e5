//! Integration tests for the training-stream handshake and fan-out.
//!
//! Sessions are driven through the in-memory transport so frame order can be
//! asserted exactly.

use std::sync::Arc;

use serde_json::Value;

use canopy::adapters::backend::DemoBackend;
use canopy::adapters::websocket::{
    handle_client_text, ConnectionManager, Frame, MemoryClient, MemoryTransport, MetricsRelay,
    CLOSE_TRY_AGAIN_LATER,
};
use canopy::config::{DemoConfig, WebSocketConfig};
use canopy::ports::TrainingBackend;

const STATE_FIELDS: &[&str] = &[
    "status",
    "phase",
    "learning_rate",
    "max_hidden_units",
    "current_epoch",
    "current_step",
    "network_name",
    "dataset_name",
    "threshold_function",
    "optimizer_name",
    "timestamp",
];

async fn setup(max_connections: usize) -> (Arc<ConnectionManager>, Arc<dyn TrainingBackend>) {
    let backend: Arc<dyn TrainingBackend> = Arc::new(DemoBackend::new(DemoConfig::default()));
    assert!(backend.initialize().await);
    let config = WebSocketConfig {
        max_connections,
        ..Default::default()
    };
    let manager = Arc::new(ConnectionManager::new(backend.clone(), &config));
    (manager, backend)
}

async fn handshake(client: &mut MemoryClient) -> Vec<Value> {
    let mut messages = Vec::new();
    for _ in 0..3 {
        messages.push(client.next_json().await.expect("handshake frame"));
    }
    messages
}

fn assert_state_data(data: &Value) {
    for field in STATE_FIELDS {
        assert!(data.get(*field).is_some(), "state.data missing {}", field);
    }

    for field in [
        "status",
        "phase",
        "network_name",
        "dataset_name",
        "threshold_function",
        "optimizer_name",
    ] {
        assert!(data[field].is_string(), "{} should be a string", field);
    }
    for field in [
        "learning_rate",
        "max_hidden_units",
        "current_epoch",
        "current_step",
        "timestamp",
    ] {
        assert!(data[field].is_number(), "{} should be numeric", field);
    }

    let status = data["status"].as_str().unwrap();
    assert!(["stopped", "started", "paused"].contains(&status));
    let phase = data["phase"].as_str().unwrap();
    assert!(["idle", "output", "candidate", "inference"].contains(&phase));
}

#[tokio::test]
async fn handshake_arrives_in_order() {
    let (manager, backend) = setup(10).await;
    let (transport, mut client) = MemoryTransport::pair();

    let id = manager.connect(transport).await.unwrap();
    let messages = handshake(&mut client).await;

    let types: Vec<&str> = messages.iter().map(|m| m["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["connection_established", "initial_status", "state"]);

    for message in &messages {
        assert!(message["timestamp"].is_number());
        assert!(message.get("data").is_some());
    }
    assert_eq!(messages[0]["data"]["client_id"], id.to_string());
    assert_eq!(messages[1]["data"]["backend_type"], "demo");
    assert_state_data(&messages[2]["data"]);

    backend.shutdown().await;
}

#[tokio::test]
async fn two_clients_get_independent_handshakes() {
    let (manager, backend) = setup(10).await;
    let (first, mut first_client) = MemoryTransport::pair();
    let (second, mut second_client) = MemoryTransport::pair();

    let (a, b) = tokio::join!(manager.connect(first), manager.connect(second));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a, b);

    let first_messages = handshake(&mut first_client).await;
    let second_messages = handshake(&mut second_client).await;

    assert_eq!(first_messages[0]["data"]["client_id"], a.to_string());
    assert_eq!(second_messages[0]["data"]["client_id"], b.to_string());
    assert_state_data(&first_messages[2]["data"]);
    assert_state_data(&second_messages[2]["data"]);

    // Nothing beyond the handshake leaked to either client.
    assert!(first_client.received().await.is_empty());
    assert!(second_client.received().await.is_empty());

    backend.shutdown().await;
}

#[tokio::test]
async fn handshake_precedes_relay_broadcast() {
    let (manager, backend) = setup(10).await;
    backend.start_training(false, Default::default()).await.unwrap();

    let (transport, mut client) = MemoryTransport::pair();
    manager.connect(transport).await.unwrap();

    let mut relay = MetricsRelay::new(manager.clone(), std::time::Duration::from_secs(60));
    relay.poll_once().await;

    let types = client.next_types(4).await;
    assert_eq!(&types[..3], ["connection_established", "initial_status", "state"]);
    assert_eq!(types[3], "state");

    backend.shutdown().await;
}

#[tokio::test]
async fn client_messages_are_answered() {
    let (manager, backend) = setup(10).await;
    let (transport, mut client) = MemoryTransport::pair();
    let id = manager.connect(transport).await.unwrap();
    handshake(&mut client).await;

    handle_client_text(&manager, id, r#"{"type": "ping"}"#).await;
    let pong = client.next_json().await.unwrap();
    assert_eq!(pong["type"], "pong");

    handle_client_text(&manager, id, r#"{"type": "request_state"}"#).await;
    let state = client.next_json().await.unwrap();
    assert_eq!(state["type"], "state");
    assert_state_data(&state["data"]);

    handle_client_text(&manager, id, "not json").await;
    let error = client.next_json().await.unwrap();
    assert_eq!(error["type"], "error");

    backend.shutdown().await;
}

#[tokio::test]
async fn over_capacity_is_rejected_before_handshake() {
    let (manager, backend) = setup(1).await;
    let (first, _first_client) = MemoryTransport::pair();
    manager.connect(first).await.unwrap();

    let (second, mut second_client) = MemoryTransport::pair();
    assert!(manager.connect(second).await.is_err());

    match second_client.next_frame().await {
        Some(Frame::Close { code, .. }) => assert_eq!(code, CLOSE_TRY_AGAIN_LATER),
        other => panic!("expected close frame, got {:?}", other),
    }
    assert_eq!(manager.session_count().await, 1);

    backend.shutdown().await;
}
