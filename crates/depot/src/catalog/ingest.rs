//! Ingest helpers: filename sanitizing, type hints, and content hashing.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::{CatalogError, CatalogResult};

/// Maximum length kept from a client-supplied filename.
const MAX_FILENAME_LEN: usize = 255;

/// Reduce a client-supplied filename to a filesystem-safe form.
///
/// Control characters are dropped, path separators and shell-dangerous
/// characters become underscores, and leading/trailing dots and spaces are
/// trimmed. Returns `None` when nothing usable remains.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == ' ');
    if sanitized.is_empty() {
        return None;
    }

    if sanitized.len() > MAX_FILENAME_LEN {
        return Some(sanitized[..MAX_FILENAME_LEN].to_string());
    }
    Some(sanitized.to_string())
}

/// Classify a package by its (sanitized) filename extension.
///
/// `"bin"` when there is no extension.
pub fn type_hint_for(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// Stream a file through SHA-256 on a blocking worker and return the hex
/// digest. The whole file is never buffered in memory.
pub async fn hash_file(path: PathBuf) -> CatalogResult<String> {
    tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| CatalogError::Backend(e.to_string()))?
    .map_err(CatalogError::Io)
}
