//! Package catalog: durable records, content hashing, and ingest.
//!
//! The catalog is append-only. Records are persisted as one JSON document
//! through a [`PackageStore`] and mirrored in memory for lookups; binaries
//! live in a flat package directory under collision-free names.

mod error;
mod ingest;
mod service;
mod store;

pub use error::{CatalogError, CatalogResult};
pub use ingest::sanitize_filename;
pub use service::Catalog;
pub use store::{JsonPackageStore, PackageStore};
