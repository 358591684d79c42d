//! Connection gateway and dispatch core.
//!
//! Classifies each upgrade by its query parameters, authenticates agents
//! against the shared secret, and runs the per-connection message loops.

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use depot_protocol::{
    AgentCommand, AgentDescriptor, AgentMessage, DashboardCommand, DashboardEvent, InstallPayload,
    Package,
};

use crate::api::AppState;

/// Connection-time parameters carried in the upgrade request's query string.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub role: Role,
    pub token: Option<String>,
    pub id: Option<String>,
    pub hostname: Option<String>,
    pub user: Option<String>,
}

/// Connection role. Unspecified connections are treated as agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Agent,
    Dashboard,
}

/// WebSocket upgrade handler for both roles.
///
/// GET /ws
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    match params.role {
        Role::Dashboard => ws.on_upgrade(move |socket| handle_dashboard(socket, state)),
        Role::Agent => {
            if !token_matches(params.token.as_deref(), &state.settings.agent_token) {
                warn!("Rejecting agent connection: bad or missing token");
                return ws.on_upgrade(reject_agent);
            }
            ws.on_upgrade(move |socket| handle_agent(socket, state, params))
        }
    }
}

/// Close an unauthenticated agent socket with a policy-violation code.
/// Nothing is registered and no messages are processed on this path.
async fn reject_agent(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: "invalid token".into(),
        })))
        .await;
}

/// Run one authenticated agent connection until it closes.
async fn handle_agent(socket: WebSocket, state: AppState, params: ConnectParams) {
    let descriptor = AgentDescriptor {
        id: params
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        hostname: params.hostname.unwrap_or_default(),
        user: params.user.unwrap_or_default(),
        last_seen: chrono::Utc::now(),
    };
    let agent_id = descriptor.id.clone();
    info!("Agent {} connected ({})", agent_id, descriptor.hostname);

    let mut commands = state.registry.register(descriptor).await;
    broadcast_agents(&state).await;

    let (mut sender, mut receiver) = socket.split();

    // Forward registry commands until the channel closes (disconnect, or
    // replacement by a newer session with the same id).
    let send_task = tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            let json = match serde_json::to_string(&command) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize agent command: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<AgentMessage>(text.as_str()) {
                Ok(message) => handle_agent_message(&state, &agent_id, message).await,
                Err(e) => debug!("Ignoring unparsable message from agent {}: {}", agent_id, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for agent {}: {}", agent_id, e);
                break;
            }
        }
    }

    send_task.abort();
    state.registry.remove(&agent_id).await;
    broadcast_agents(&state).await;
    info!("Agent {} disconnected", agent_id);
}

/// Apply one inbound agent message.
async fn handle_agent_message(state: &AppState, agent_id: &str, message: AgentMessage) {
    state.registry.touch(agent_id).await;
    match message {
        AgentMessage::Status { status, detail } => {
            state
                .hub
                .broadcast(DashboardEvent::Status {
                    agent_id: agent_id.to_string(),
                    status,
                    detail,
                })
                .await;
        }
    }
}

/// Run one dashboard connection until it closes.
///
/// The connect-time snapshot (`packages`, then `agents`) is enqueued ahead
/// of any live event by the hub.
async fn handle_dashboard(socket: WebSocket, state: AppState) {
    let packages = state.catalog.list().await;
    let agents = state.registry.snapshot().await;
    let (conn_id, mut events) = state
        .hub
        .join(vec![
            DashboardEvent::Packages { packages },
            DashboardEvent::Agents { agents },
        ])
        .await;

    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize dashboard event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<DashboardCommand>(text.as_str()) {
                    Ok(command) => handle_dashboard_command(&state, command).await,
                    Err(e) => debug!("Ignoring unparsable dashboard message: {}", e),
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for dashboard connection {}: {}", conn_id, e);
                break;
            }
        }
    }

    send_task.abort();
    state.hub.leave(conn_id).await;
}

/// Apply one inbound dashboard command.
async fn handle_dashboard_command(state: &AppState, command: DashboardCommand) {
    match command {
        DashboardCommand::InstallRequest {
            target_agent_ids,
            package_id,
        } => dispatch_install(state, &target_agent_ids, &package_id).await,
    }
}

/// Expand one install request into per-agent commands.
///
/// An unknown package drops the whole request; an absent or closed target
/// is skipped per-agent. The requesting dashboard gets no delivery report
/// either way.
pub(crate) async fn dispatch_install(state: &AppState, targets: &[String], package_id: &str) {
    let Some(package) = state.catalog.get(package_id).await else {
        debug!("Dropping install request for unknown package {}", package_id);
        return;
    };
    let payload = install_payload(&package, state.settings.public_url.as_deref());
    for target in targets {
        let command = AgentCommand::InstallRequest {
            package: payload.clone(),
        };
        if state.registry.send(target, command).await {
            info!("Dispatched install of {} to agent {}", package.name, target);
        }
    }
}

/// Push the current agent snapshot to every dashboard.
async fn broadcast_agents(state: &AppState) {
    let agents = state.registry.snapshot().await;
    state.hub.broadcast(DashboardEvent::Agents { agents }).await;
}

fn install_payload(package: &Package, public_url: Option<&str>) -> InstallPayload {
    InstallPayload {
        id: package.id.clone(),
        name: package.name.clone(),
        version: package.version.clone(),
        sha256: package.sha256.clone(),
        size_bytes: package.size_bytes,
        url: download_url(&package.filename, public_url),
        type_hint: package.type_hint.clone(),
    }
}

/// Retrieval locator for a stored filename: relative when no public base
/// URL is configured, so any file server fronting the package directory
/// can satisfy it.
fn download_url(filename: &str, public_url: Option<&str>) -> String {
    let encoded = urlencoding::encode(filename);
    match public_url {
        Some(base) => format!("{}/packages/{}", base.trim_end_matches('/'), encoded),
        None => format!("/packages/{}", encoded),
    }
}

fn token_matches(supplied: Option<&str>, expected: &str) -> bool {
    supplied.is_some_and(|token| token == expected)
}
