//! Tenant path namespace: `teams/{team_id}/{relative}`.
//!
//! The blob store is flat; this module is the only place that knows the
//! prefix convention. Deterministic, side-effect free, no I/O.

use crate::error::{DriveError, Result};

const TEAM_PREFIX: &str = "teams";

/// Collapse duplicate separators and strip leading/trailing slashes.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Root prefix for a team, without trailing slash: `teams/{id}`.
pub fn team_root(team_id: &str) -> Result<String> {
    let team_id = team_id.trim();
    if team_id.is_empty() {
        return Err(DriveError::MissingTenant);
    }
    Ok(format!("{TEAM_PREFIX}/{team_id}"))
}

/// Canonical blob path for a relative folder or file path. An empty relative
/// path denotes the team root.
pub fn resolve(team_id: &str, relative: &str) -> Result<String> {
    let root = team_root(team_id)?;
    let rel = normalize(relative);
    if rel.is_empty() {
        Ok(root)
    } else {
        Ok(format!("{root}/{rel}"))
    }
}

/// Strip the team prefix from a full blob path. Paths outside the team root
/// are returned normalized but untouched; the root itself maps to `""`.
pub fn relative_from(team_id: &str, full_path: &str) -> Result<String> {
    let root = team_root(team_id)?;
    let full = normalize(full_path);
    if full == root {
        return Ok(String::new());
    }
    match full.strip_prefix(&format!("{root}/")) {
        Some(rest) => Ok(rest.to_string()),
        None => Ok(full),
    }
}

/// Last path segment.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a relative path (`""` for top-level entries).
pub fn parent(relative: &str) -> &str {
    match relative.rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}
