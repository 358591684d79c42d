//! Messages the server pushes to connected clients.

use serde::{Deserialize, Serialize};

use crate::types::{AgentDescriptor, InstallPayload, Package};

/// Events sent to dashboard connections.
///
/// A freshly connected dashboard receives `Packages` then `Agents` as its
/// starting snapshot before any incremental event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Full package catalog (on connect and after every ingest).
    Packages { packages: Vec<Package> },

    /// Full agent registry snapshot (on connect and on every join/leave).
    Agents { agents: Vec<AgentDescriptor> },

    /// A status report relayed from one agent.
    #[serde(rename_all = "camelCase")]
    Status {
        agent_id: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Commands sent to agent connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Fetch and install one package. Fire-and-forget; no ack is tracked.
    InstallRequest { package: InstallPayload },
}
