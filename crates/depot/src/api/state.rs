//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::ws::{AgentRegistry, DashboardHub};

/// Runtime settings the handlers need.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    /// Shared secret agents must present on connect.
    pub agent_token: String,
    /// External base URL for download links, when the server sits behind a
    /// proxy. Links are relative when unset.
    pub public_url: Option<String>,
    /// Upload size cap in bytes.
    pub max_upload_size: u64,
}

/// Application state shared across all handlers.
///
/// The registries are explicitly constructed here and passed by reference
/// everywhere; nothing in the core is process-global.
#[derive(Clone)]
pub struct AppState {
    /// Package catalog and ingest pipeline.
    pub catalog: Arc<Catalog>,
    /// Currently-connected agents.
    pub registry: Arc<AgentRegistry>,
    /// Currently-connected dashboards.
    pub hub: Arc<DashboardHub>,
    /// Runtime settings.
    pub settings: Arc<ServeSettings>,
}

impl AppState {
    pub fn new(catalog: Catalog, settings: ServeSettings) -> Self {
        Self {
            catalog: Arc::new(catalog),
            registry: Arc::new(AgentRegistry::new()),
            hub: Arc::new(DashboardHub::new()),
            settings: Arc::new(settings),
        }
    }
}
