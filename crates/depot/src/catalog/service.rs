//! In-memory catalog over a durable package store.

use chrono::Utc;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use uuid::Uuid;

use depot_protocol::Package;

use super::ingest::{hash_file, sanitize_filename, type_hint_for};
use super::store::PackageStore;
use super::{CatalogError, CatalogResult};

/// The package catalog: append-only record list plus the directory holding
/// the package binaries.
///
/// All mutation happens under one write lock, and every save goes through
/// the store before the record becomes visible to readers, so a listed
/// package is always durable.
pub struct Catalog {
    packages: RwLock<Vec<Package>>,
    store: Box<dyn PackageStore>,
    package_dir: PathBuf,
}

impl Catalog {
    /// Open the catalog: ensure the package directory exists and load the
    /// persisted records.
    pub async fn open(
        store: Box<dyn PackageStore>,
        package_dir: impl Into<PathBuf>,
    ) -> CatalogResult<Self> {
        let package_dir = package_dir.into();
        tokio::fs::create_dir_all(&package_dir).await?;
        let packages = store.load().await?;
        Ok(Self {
            packages: RwLock::new(packages),
            store,
            package_dir,
        })
    }

    /// Current catalog contents, in ingestion order.
    pub async fn list(&self) -> Vec<Package> {
        self.packages.read().await.clone()
    }

    /// Number of catalogued packages.
    pub async fn len(&self) -> usize {
        self.packages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.packages.read().await.is_empty()
    }

    /// Look up a package by id.
    pub async fn get(&self, id: &str) -> Option<Package> {
        self.packages.read().await.iter().find(|p| p.id == id).cloned()
    }

    /// Look up a package by its stored filename.
    pub async fn get_by_filename(&self, filename: &str) -> Option<Package> {
        self.packages
            .read()
            .await
            .iter()
            .find(|p| p.filename == filename)
            .cloned()
    }

    /// On-disk location of a package's binary.
    pub fn path_for(&self, package: &Package) -> PathBuf {
        self.package_dir.join(&package.filename)
    }

    /// Write upload bytes to a temp file inside the package directory, so
    /// the later rename at ingest never crosses a filesystem.
    pub async fn spool(&self, data: Vec<u8>) -> CatalogResult<NamedTempFile> {
        let dir = self.package_dir.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".upload-")
                .tempfile_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.flush()?;
            Ok(tmp)
        })
        .await
        .map_err(|e| CatalogError::Backend(e.to_string()))?
        .map_err(CatalogError::Io)
    }

    /// Ingest one finished upload into the catalog.
    ///
    /// The temp file is renamed under its final collision-free name, hashed
    /// by streaming, and the record is persisted before it becomes visible.
    /// On any failure no record is registered.
    pub async fn ingest(
        &self,
        file: NamedTempFile,
        original_name: &str,
        name: Option<String>,
        version: Option<String>,
    ) -> CatalogResult<Package> {
        let sanitized = sanitize_filename(original_name)
            .ok_or_else(|| CatalogError::InvalidFilename(original_name.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let stored_name = format!("{id}_{sanitized}");
        let dest = self.package_dir.join(&stored_name);

        // Atomic rename; no partial file is ever visible under the final name.
        file.persist(&dest).map_err(|e| CatalogError::Io(e.error))?;

        let size_bytes = tokio::fs::metadata(&dest).await?.len();
        let sha256 = hash_file(dest.clone()).await?;

        let package = Package {
            name: name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| display_name(&sanitized)),
            version: version
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0.0.0".to_string()),
            id,
            filename: stored_name,
            size_bytes,
            sha256,
            created_at: Utc::now(),
            type_hint: type_hint_for(&sanitized),
        };

        let mut packages = self.packages.write().await;
        if packages
            .iter()
            .any(|p| p.id == package.id || p.filename == package.filename)
        {
            return Err(CatalogError::Duplicate(package.filename.clone()));
        }
        packages.push(package.clone());
        if let Err(e) = self.store.save(&packages).await {
            packages.pop();
            return Err(e);
        }
        drop(packages);

        info!(
            "Ingested package {} v{} ({} bytes, sha256 {})",
            package.name, package.version, package.size_bytes, package.sha256
        );
        Ok(package)
    }
}

/// Default display name: the sanitized filename without its extension.
fn display_name(sanitized: &str) -> String {
    Path::new(sanitized)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(sanitized)
        .to_string()
}
