//! Orphan-folder detection.
//!
//! A folder whose only direct contents are placeholder markers, or one that
//! shows up in a listing with nothing at all under its prefix, is proposed
//! for cleanup. Detection never deletes anything; the destructive step is a
//! separate, explicitly confirmed recursive delete per candidate.

use crate::error::Result;
use crate::path;

use super::entry::{is_marker, CleanupCandidate, CleanupReason, StorageEntry};
use super::TeamDrive;

/// Classify folders from a flattened walk. Only direct children count: a
/// folder with a populated sub-folder is never a candidate even if its own
/// files are all markers. Folders in `truncated` had their contents cut off
/// by the walk's depth cap, so nothing can be concluded about them.
pub fn candidates(entries: &[StorageEntry], truncated: &[String]) -> Vec<CleanupCandidate> {
    entries
        .iter()
        .filter(|e| e.is_folder)
        .filter_map(|folder| {
            let rel = folder.relative_path.as_str();
            if truncated.iter().any(|t| t == rel) {
                return None;
            }
            let direct_files: Vec<&StorageEntry> = entries
                .iter()
                .filter(|e| !e.is_folder && path::parent(&e.relative_path) == rel)
                .collect();
            let direct_folders = entries
                .iter()
                .filter(|e| e.is_folder && path::parent(&e.relative_path) == rel)
                .count();
            if direct_folders > 0 {
                return None;
            }
            if direct_files.is_empty() {
                // No object carries this prefix at all: a transient/phantom
                // entry the store reported anyway.
                Some(CleanupCandidate {
                    folder: rel.to_string(),
                    kind: CleanupReason::Empty,
                    reason: "no objects observed under this prefix".to_string(),
                    items: 0,
                })
            } else if direct_files.iter().all(|e| is_marker(&e.name)) {
                Some(CleanupCandidate {
                    folder: rel.to_string(),
                    kind: CleanupReason::OnlyMarkers,
                    reason: format!(
                        "contains only placeholder markers ({} file(s))",
                        direct_files.len()
                    ),
                    items: direct_files.len(),
                })
            } else {
                None
            }
        })
        .collect()
}

impl TeamDrive {
    /// Scan the whole team tree and propose folders safe to delete.
    pub async fn cleanup_candidates(&self, team_id: &str) -> Result<Vec<CleanupCandidate>> {
        let (entries, truncated) = self.walk_tracking_truncation(team_id, "").await?;
        let found = candidates(&entries, &truncated);
        let scanned = entries.iter().filter(|e| e.is_folder).count();
        self.log.push(format!(
            "cleanup scan for team {team_id}: {scanned} folders scanned, {} marked",
            found.len()
        ));
        Ok(found)
    }
}
