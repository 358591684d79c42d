//! Durable package store.
//!
//! The store is a dumb collaborator: it loads and saves the whole catalog.
//! Uniqueness and ordering are the in-memory catalog's business.

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use tokio::fs;

use depot_protocol::Package;

use super::{CatalogError, CatalogResult};

/// Persistence backend for the package catalog.
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Load all known package records. A store that has never been written
    /// returns an empty list, not an error.
    async fn load(&self) -> CatalogResult<Vec<Package>>;

    /// Persist the whole catalog, replacing any previous contents.
    async fn save(&self, packages: &[Package]) -> CatalogResult<()>;
}

/// JSON-file package store.
///
/// Saves rewrite a sibling temp file and rename it into place, so readers
/// never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonPackageStore {
    path: PathBuf,
}

impl JsonPackageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PackageStore for JsonPackageStore {
    async fn load(&self) -> CatalogResult<Vec<Package>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::Io(e)),
        };
        let packages: Vec<Package> = serde_json::from_slice(&raw)?;
        debug!("Loaded {} package record(s) from {}", packages.len(), self.path.display());
        Ok(packages)
    }

    async fn save(&self, packages: &[Package]) -> CatalogResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(packages)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Saved {} package record(s) to {}", packages.len(), self.path.display());
        Ok(())
    }
}
