//! Registry of currently-connected agents.

use chrono::Utc;
use log::{debug, info};
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};

use depot_protocol::{AgentCommand, AgentDescriptor};

/// Size of the per-agent command buffer.
const COMMAND_BUFFER_SIZE: usize = 32;

struct AgentEntry {
    descriptor: AgentDescriptor,
    commands: mpsc::Sender<AgentCommand>,
}

/// Mapping from agent id to its live record.
///
/// One exclusion domain guards the whole map: snapshots are point-in-time
/// consistent and a registration can never interleave with a concurrent
/// snapshot mid-update. The command sender never leaves this module; the
/// outside world only sees [`AgentDescriptor`]s.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentEntry>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the entry for this agent id and hand back the
    /// command receiver for its connection task.
    ///
    /// A reconnect with the same id replaces the prior entry: the old
    /// sender is dropped, which closes the old connection's receiver.
    pub async fn register(&self, descriptor: AgentDescriptor) -> mpsc::Receiver<AgentCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let id = descriptor.id.clone();
        let replaced = self
            .agents
            .write()
            .await
            .insert(
                id.clone(),
                AgentEntry {
                    descriptor,
                    commands: tx,
                },
            )
            .is_some();
        if replaced {
            info!("Agent {} re-registered, replacing prior session", id);
        } else {
            info!("Agent {} registered", id);
        }
        rx
    }

    /// Update `last_seen` for an agent; called on every inbound message.
    pub async fn touch(&self, id: &str) {
        if let Some(entry) = self.agents.write().await.get_mut(id) {
            entry.descriptor.last_seen = Utc::now();
        }
    }

    /// Delete the entry on disconnect.
    pub async fn remove(&self, id: &str) {
        if self.agents.write().await.remove(id).is_some() {
            info!("Agent {} removed", id);
        }
    }

    /// Ordered list of public agent fields for transmission.
    pub async fn snapshot(&self) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut list: Vec<AgentDescriptor> =
            agents.values().map(|e| e.descriptor.clone()).collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Best-effort command delivery to one agent.
    ///
    /// Returns `false` when the target is unknown or its connection can no
    /// longer accept (closed or saturated buffer); the command is dropped.
    pub async fn send(&self, id: &str, command: AgentCommand) -> bool {
        let agents = self.agents.read().await;
        let Some(entry) = agents.get(id) else {
            debug!("Dropping command for unknown agent {}", id);
            return false;
        };
        match entry.commands.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping command for agent {}: {}", id, e);
                false
            }
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
