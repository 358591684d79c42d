//! Messages clients send to the server.

use serde::{Deserialize, Serialize};

/// Commands a dashboard may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardCommand {
    /// Push one package to a set of agents.
    ///
    /// Targets that are unknown or disconnected are skipped silently; no
    /// delivery report comes back.
    #[serde(rename_all = "camelCase")]
    InstallRequest {
        target_agent_ids: Vec<String>,
        package_id: String,
    },
}

/// Messages an agent may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Free-form status report, relayed to all dashboards.
    Status {
        status: String,
        #[serde(default)]
        detail: Option<String>,
    },
}
