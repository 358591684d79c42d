//! Test utilities and common setup.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use axum::Router;
use depot::api::{self, AppState, ServeSettings};
use depot::catalog::{Catalog, JsonPackageStore};
use tempfile::TempDir;

/// Shared agent secret used by all test apps.
pub const TEST_TOKEN: &str = "fleet-secret";

/// Create a test application backed by a throwaway data directory.
///
/// The TempDir must stay alive for the duration of the test.
pub async fn test_app() -> (Router, TempDir) {
    let (router, _state, dir) = test_app_with_state().await;
    (router, dir)
}

/// Same, but also hand back the state for direct catalog/registry access.
pub async fn test_app_with_state() -> (Router, AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = JsonPackageStore::new(dir.path().join("packages.json"));
    let catalog = Catalog::open(Box::new(store), dir.path().join("packages"))
        .await
        .unwrap();
    let state = AppState::new(
        catalog,
        ServeSettings {
            agent_token: TEST_TOKEN.to_string(),
            public_url: None,
            max_upload_size: 16 * 1024 * 1024,
        },
    );
    (api::create_router(state.clone()), state, dir)
}
