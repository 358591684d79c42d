//! Hub of connected dashboard sessions and event fan-out.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

use depot_protocol::DashboardEvent;

/// Size of the per-dashboard event buffer.
const EVENT_BUFFER_SIZE: usize = 64;

/// Set of live dashboard connections.
///
/// Dashboards carry no identity; membership is keyed by a connection
/// counter. Fan-out iterates the members under the same lock that guards
/// membership changes, so a join or leave can never corrupt a broadcast
/// in flight.
pub struct DashboardHub {
    members: RwLock<HashMap<u64, mpsc::Sender<DashboardEvent>>>,
    next_id: AtomicU64,
}

impl DashboardHub {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Admit a dashboard connection.
    ///
    /// The greeting events (the connect-time snapshot) are enqueued before
    /// the sender joins the member set, so they always precede any
    /// broadcast on the returned receiver.
    pub async fn join(
        &self,
        greeting: Vec<DashboardEvent>,
    ) -> (u64, mpsc::Receiver<DashboardEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        for event in greeting {
            // Cannot fail: the channel is fresh and we hold the receiver.
            let _ = tx.try_send(event);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.members.write().await.insert(id, tx);
        info!("Dashboard connection {} joined", id);
        (id, rx)
    }

    /// Remove a dashboard on disconnect. Silent; nothing is broadcast.
    pub async fn leave(&self, id: u64) {
        if self.members.write().await.remove(&id).is_some() {
            info!("Dashboard connection {} left", id);
        }
    }

    /// Fan one event out to every open dashboard.
    ///
    /// A member whose connection is gone or whose buffer is saturated is
    /// skipped; delivery is never awaited.
    pub async fn broadcast(&self, event: DashboardEvent) {
        let members = self.members.read().await;
        for (id, tx) in members.iter() {
            if let Err(e) = tx.try_send(event.clone()) {
                debug!("Skipping dashboard connection {}: {}", id, e);
            }
        }
    }

    /// Number of connected dashboards.
    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}

impl Default for DashboardHub {
    fn default() -> Self {
        Self::new()
    }
}
