//! Records shared across the wire protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalogued installable artifact.
///
/// `id` and `filename` are unique for the lifetime of the catalog; `sha256`
/// is computed once at ingest and treated as the package's identity proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Unique catalog id, assigned at upload time.
    pub id: String,
    /// Display name, operator-supplied or derived from the filename.
    pub name: String,
    /// Free-text version string.
    pub version: String,
    /// Stored filename: `{id}_{sanitized original name}`.
    pub filename: String,
    /// Byte length at upload time.
    pub size_bytes: u64,
    /// Hex SHA-256 digest over the stored file.
    pub sha256: String,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
    /// Installer classification derived from the file extension.
    pub type_hint: String,
}

/// Public view of a connected agent, as sent to dashboards.
///
/// The live connection handle never appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Stable identifier, client-chosen or generated on connect.
    pub id: String,
    /// Reported machine hostname, not validated.
    pub hostname: String,
    /// Reported user, not validated.
    pub user: String,
    /// Updated on connect and on every inbound message.
    pub last_seen: DateTime<Utc>,
}

/// Everything an agent needs to fetch and run one install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallPayload {
    pub id: String,
    pub name: String,
    pub version: String,
    pub sha256: String,
    pub size_bytes: u64,
    /// Retrieval locator for the stored binary.
    pub url: String,
    pub type_hint: String,
}
