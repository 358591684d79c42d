//! WebSocket gateway integration tests: real server, real sockets.

use std::time::Duration;

use depot::api::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

mod common;
use common::{TEST_TOKEN, test_app_with_state};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind the app on an ephemeral port and return its ws URL base.
async fn spawn_server() -> (String, AppState, TempDir) {
    let (router, state, dir) = test_app_with_state().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("ws://{addr}/ws"), state, dir)
}

async fn connect_dashboard(base: &str) -> WsStream {
    let (ws, _) = connect_async(format!("{base}?role=dashboard")).await.unwrap();
    ws
}

async fn connect_agent(base: &str, id: &str) -> WsStream {
    let url = format!(
        "{base}?role=agent&token={TEST_TOKEN}&id={id}&hostname={id}-host&user=svc"
    );
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn next_message(ws: &mut WsStream) -> Message {
    timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("socket closed unexpectedly")
        .expect("websocket error")
}

async fn next_json(ws: &mut WsStream) -> Value {
    match next_message(ws).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Drain dashboard events until an `agents` snapshot includes `id`.
///
/// An agent's registration broadcast can land before or after a concurrent
/// dashboard greeting; tests that need the agent visible wait here instead
/// of assuming a fixed event position.
async fn wait_for_agent(dashboard: &mut WsStream, id: &str) {
    loop {
        let event = next_json(dashboard).await;
        if event["type"] == "agents"
            && event["agents"]
                .as_array()
                .unwrap()
                .iter()
                .any(|a| a["id"] == id)
        {
            return;
        }
    }
}

/// Ingest a throwaway package directly through the catalog.
async fn ingest_sample(state: &AppState) -> Value {
    let tmp = state.catalog.spool(b"payload".to_vec()).await.unwrap();
    let package = state
        .catalog
        .ingest(tmp, "setup.exe", Some("Tool".to_string()), Some("1.0".to_string()))
        .await
        .unwrap();
    serde_json::to_value(package).unwrap()
}

#[tokio::test]
async fn dashboard_receives_snapshots_in_order() {
    let (base, state, _dir) = spawn_server().await;
    ingest_sample(&state).await;

    let mut dashboard = connect_dashboard(&base).await;

    let first = next_json(&mut dashboard).await;
    assert_eq!(first["type"], "packages");
    assert_eq!(first["packages"].as_array().unwrap().len(), 1);

    let second = next_json(&mut dashboard).await;
    assert_eq!(second["type"], "agents");
    assert_eq!(second["agents"], json!([]));
}

#[tokio::test]
async fn agent_with_bad_token_is_rejected() {
    let (base, state, _dir) = spawn_server().await;

    let url = format!("{base}?role=agent&token=wrong&id=intruder");
    let (mut ws, _) = connect_async(url).await.unwrap();

    match next_message(&mut ws).await {
        Message::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::Policy),
        other => panic!("expected a close frame, got {other:?}"),
    }
    assert!(state.registry.snapshot().await.is_empty());
}

#[tokio::test]
async fn agent_join_and_leave_are_broadcast() {
    let (base, _state, _dir) = spawn_server().await;

    let mut dashboard = connect_dashboard(&base).await;
    assert_eq!(next_json(&mut dashboard).await["type"], "packages");
    assert_eq!(next_json(&mut dashboard).await["type"], "agents");

    let mut agent = connect_agent(&base, "A").await;
    let joined = next_json(&mut dashboard).await;
    assert_eq!(joined["type"], "agents");
    assert_eq!(joined["agents"][0]["id"], "A");
    assert_eq!(joined["agents"][0]["hostname"], "A-host");

    agent.close(None).await.unwrap();
    let left = next_json(&mut dashboard).await;
    assert_eq!(left["type"], "agents");
    assert_eq!(left["agents"], json!([]));
}

#[tokio::test]
async fn install_request_reaches_only_existing_targets() {
    let (base, state, _dir) = spawn_server().await;
    let package = ingest_sample(&state).await;

    let mut agent = connect_agent(&base, "A").await;

    let mut dashboard = connect_dashboard(&base).await;
    assert_eq!(next_json(&mut dashboard).await["type"], "packages");
    wait_for_agent(&mut dashboard, "A").await;

    // Target one live agent and one that does not exist.
    send_json(
        &mut dashboard,
        json!({
            "type": "install_request",
            "targetAgentIds": ["A", "C"],
            "packageId": package["id"],
        }),
    )
    .await;

    let command = next_json(&mut agent).await;
    assert_eq!(command["type"], "install_request");
    assert_eq!(command["package"]["id"], package["id"]);
    assert_eq!(command["package"]["sha256"], package["sha256"]);
    assert_eq!(command["package"]["typeHint"], "exe");
    assert_eq!(
        command["package"]["url"],
        format!("/packages/{}", package["filename"].as_str().unwrap())
    );

    // No error reaches the dashboard for the missing target.
    let quiet = timeout(Duration::from_millis(300), dashboard.next()).await;
    assert!(quiet.is_err(), "dashboard should hear nothing back");
}

#[tokio::test]
async fn agent_status_is_relayed_to_dashboards() {
    let (base, _state, _dir) = spawn_server().await;

    let mut agent = connect_agent(&base, "A").await;

    let mut dashboard = connect_dashboard(&base).await;
    assert_eq!(next_json(&mut dashboard).await["type"], "packages");
    wait_for_agent(&mut dashboard, "A").await;

    send_json(
        &mut agent,
        json!({"type": "status", "status": "installing", "detail": "42%"}),
    )
    .await;

    let event = next_json(&mut dashboard).await;
    assert_eq!(event["type"], "status");
    assert_eq!(event["agentId"], "A");
    assert_eq!(event["status"], "installing");
    assert_eq!(event["detail"], "42%");
}

#[tokio::test]
async fn malformed_messages_are_ignored() {
    let (base, _state, _dir) = spawn_server().await;

    let mut agent = connect_agent(&base, "A").await;

    let mut dashboard = connect_dashboard(&base).await;
    assert_eq!(next_json(&mut dashboard).await["type"], "packages");
    wait_for_agent(&mut dashboard, "A").await;

    // Garbage, an unknown type, and a wrong shape: all dropped silently.
    send_json(&mut dashboard, json!({"type": "reboot_fleet"})).await;
    dashboard
        .send(Message::Text("not json at all".into()))
        .await
        .unwrap();
    send_json(&mut agent, json!({"type": "status"})).await;

    // The connections stay usable afterwards.
    send_json(
        &mut agent,
        json!({"type": "status", "status": "ok"}),
    )
    .await;
    let event = next_json(&mut dashboard).await;
    assert_eq!(event["type"], "status");
    assert_eq!(event["status"], "ok");
}
