//! Error taxonomy for team storage operations.
//!
//! Per-item metadata failures during listing never reach this enum; they are
//! absorbed into degraded entries with `has_error` set. Everything here is
//! meant to surface to the caller with a human-readable message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("no team id provided; every storage operation needs a team context")]
    MissingTenant,

    /// The team root itself could not be listed (permissions, auth). Fatal to
    /// the call, unlike per-item metadata failures.
    #[error("team storage for '{team_id}' is unreachable: {reason}")]
    TenantUnavailable { team_id: String, reason: String },

    #[error("invalid file name '{0}': must be non-empty and contain no '/'")]
    InvalidName(String),

    #[error("no such object: {0}")]
    NotFound(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Bulk delete where some objects failed. The remaining objects are left
    /// in place for a follow-up attempt.
    #[error("{failed} of {total} objects could not be deleted ({deleted} deleted)")]
    PartialFailure {
        deleted: usize,
        failed: usize,
        total: usize,
    },

    #[error("storage call '{0}' timed out")]
    Timeout(&'static str),

    #[error("storage backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;
