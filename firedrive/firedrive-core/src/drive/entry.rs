//! Uniform records for everything the drive hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path;
use crate::storage::BlobMeta;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const FOLDER_MIME: &str = "folder";

/// Placeholder blobs that establish otherwise-empty folders. Structurally
/// ordinary objects; filtered out of every user-facing listing.
pub const MARKER_NAMES: &[&str] = &[".keep", ".placeholder"];

pub fn is_marker(name: &str) -> bool {
    MARKER_NAMES.contains(&name)
}

/// A file or folder as observed in the blob namespace. Identity is the full
/// blob path; a folder has no stored existence and carries no metadata.
#[derive(Debug, Clone, Serialize)]
pub struct StorageEntry {
    pub id: String,
    pub name: String,
    pub full_path: String,
    pub relative_path: String,
    pub team_id: String,
    pub is_folder: bool,
    pub mime_type: String,
    pub size: Option<u64>,
    pub modified_time: Option<String>,
    pub download_url: Option<String>,
    /// Metadata retrieval failed but the object's existence is known.
    pub has_error: bool,
}

impl StorageEntry {
    pub fn folder(team_id: &str, full_path: &str) -> crate::error::Result<Self> {
        Ok(Self {
            id: full_path.to_string(),
            name: path::basename(full_path).to_string(),
            full_path: full_path.to_string(),
            relative_path: path::relative_from(team_id, full_path)?,
            team_id: team_id.to_string(),
            is_folder: true,
            mime_type: FOLDER_MIME.to_string(),
            size: None,
            modified_time: None,
            download_url: None,
            has_error: false,
        })
    }

    pub fn file(
        team_id: &str,
        full_path: &str,
        meta: &BlobMeta,
        download_url: Option<String>,
    ) -> crate::error::Result<Self> {
        Ok(Self {
            id: full_path.to_string(),
            name: path::basename(full_path).to_string(),
            full_path: full_path.to_string(),
            relative_path: path::relative_from(team_id, full_path)?,
            team_id: team_id.to_string(),
            is_folder: false,
            mime_type: meta
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            size: Some(meta.size),
            modified_time: meta.created.as_ref().map(DateTime::<Utc>::to_rfc3339),
            download_url,
            has_error: false,
        })
    }

    /// Entry for an object whose metadata fetch failed: existence is known,
    /// everything else is defaulted.
    pub fn degraded_file(team_id: &str, full_path: &str) -> crate::error::Result<Self> {
        Ok(Self {
            id: full_path.to_string(),
            name: path::basename(full_path).to_string(),
            full_path: full_path.to_string(),
            relative_path: path::relative_from(team_id, full_path)?,
            team_id: team_id.to_string(),
            is_folder: false,
            mime_type: DEFAULT_CONTENT_TYPE.to_string(),
            size: None,
            modified_time: None,
            download_url: None,
            has_error: true,
        })
    }
}

/// One level of a team folder.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Listing {
    pub folders: Vec<StorageEntry>,
    pub files: Vec<StorageEntry>,
}

/// Outcome of a recursive folder delete. Partial failure is expected and
/// reported, never swallowed; the failed objects stay put for a retry.
#[derive(Debug, Clone, Serialize)]
pub struct FolderDeletion {
    pub folder: String,
    pub team_id: String,
    pub deleted: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub team_id: String,
    pub total_items: usize,
    pub files: usize,
    pub folders: usize,
    pub total_size: u64,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuickStats {
    pub team_id: String,
    pub root_folders: usize,
    pub root_files: usize,
    pub has_content: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageExists {
    pub exists: bool,
    pub files: usize,
    pub folders: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub ok: bool,
    pub team_id: String,
    pub files: usize,
    pub folders: usize,
    pub message: String,
}

/// Descriptor blob written at `teams/{id}/team-info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfo {
    pub team_id: String,
    pub team_name: String,
    pub created: String,
    pub folders: Vec<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamProvisioning {
    pub team_id: String,
    pub team_name: String,
    pub folders: Vec<String>,
    pub base_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupReason {
    OnlyMarkers,
    Empty,
}

/// A folder the cleanup pass proposes for deletion. Detection only; the
/// destructive step is a separate, explicitly confirmed call.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupCandidate {
    pub folder: String,
    pub kind: CleanupReason,
    pub reason: String,
    pub items: usize,
}
