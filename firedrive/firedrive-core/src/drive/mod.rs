//! Team-scoped virtual filesystem over a flat blob store.
//!
//! The store has no directory entity: a folder exists only while some object
//! key carries it as a prefix segment, or while a placeholder marker written
//! directly under it survives. Everything here derives the hierarchy from
//! observed keys so callers never reason about raw paths.
//!
//! Consistency is last-write-wins with no coordination between writers. The
//! only mitigation for propagation lag is the delay-then-refresh pass after
//! writes, which makes a fresh write *probably* visible, nothing stronger.

pub mod cleanup;
pub mod entry;
pub mod walk;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use tracing::warn;

use crate::cache::TtlCache;
use crate::diag::DriveLog;
use crate::error::{DriveError, Result};
use crate::path;
use crate::storage::{BlobStore, ChildList};

use entry::{
    is_marker, ConnectionReport, FolderDeletion, Listing, QuickStats, StorageEntry, StorageExists,
    StorageStats, TeamInfo, TeamProvisioning,
};

/// Folder names provisioned for every new team.
pub const DEFAULT_FOLDERS: &[&str] = &["documentos", "polizas", "reportes", "uploads", "temp"];

const TEAM_INFO_NAME: &str = "team-info.json";
const TEAM_INFO_VERSION: &str = "1.0";
const STATS_CACHE_TTL: Duration = Duration::from_secs(600);
const LIST_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Upper bound on any single blob-store call.
    pub call_timeout: Duration,
    /// Sleep before the post-write re-list; zero disables the refresh pass.
    pub propagation_delay: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            propagation_delay: Duration::from_secs(2),
        }
    }
}

pub struct TeamDrive {
    store: Arc<dyn BlobStore>,
    config: DriveConfig,
    stats_cache: TtlCache<StorageStats>,
    list_cache: TtlCache<Listing>,
    log: DriveLog,
}

impl TeamDrive {
    pub fn new(store: Arc<dyn BlobStore>, config: DriveConfig) -> Self {
        Self {
            store,
            config,
            stats_cache: TtlCache::new(),
            list_cache: TtlCache::new(),
            log: DriveLog::default(),
        }
    }

    /// Drop everything the team may be seeing stale. Called after every
    /// write; the caches have no finer-grained invalidation.
    fn invalidate_caches(&self, team_id: &str) {
        self.stats_cache.invalidate_team(team_id);
        self.list_cache.invalidate_team(team_id);
    }

    /// Snapshot of the diagnostic trail, oldest first.
    pub fn diagnostics(&self) -> Vec<String> {
        self.log.snapshot()
    }

    /// Wrap a backend call with the configured timeout.
    async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DriveError::Backend(err)),
            Err(_) => Err(DriveError::Timeout(op)),
        }
    }

    /// One level of raw children. A failed listing is fatal to the call and
    /// maps to `TenantUnavailable`, unlike per-item metadata failures.
    pub(crate) async fn list_level(&self, team_id: &str, rel: &str) -> Result<ChildList> {
        let prefix = path::resolve(team_id, rel)?;
        match self.call("list_children", self.store.list_children(&prefix)).await {
            Ok(children) => Ok(children),
            Err(DriveError::Timeout(op)) => Err(DriveError::Timeout(op)),
            Err(err) => Err(DriveError::TenantUnavailable {
                team_id: team_id.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Build a file entry, fetching metadata (and optionally a download URL)
    /// in isolation: a failure degrades this entry instead of aborting the
    /// batch.
    pub(crate) async fn file_entry(
        &self,
        team_id: &str,
        key: &str,
        with_url: bool,
    ) -> Result<StorageEntry> {
        let meta = match self.call("get_metadata", self.store.get_metadata(key)).await {
            Ok(meta) => meta,
            Err(err) => {
                warn!(key, %err, "metadata fetch failed; emitting degraded entry");
                return StorageEntry::degraded_file(team_id, key);
            }
        };
        if !with_url {
            return StorageEntry::file(team_id, key, &meta, None);
        }
        match self.call("download_url", self.store.download_url(key)).await {
            Ok(url) => StorageEntry::file(team_id, key, &meta, Some(url)),
            Err(err) => {
                warn!(key, %err, "download url fetch failed; emitting degraded entry");
                StorageEntry::degraded_file(team_id, key)
            }
        }
    }

    /// Immediate children of a folder with metadata and download URLs.
    /// Marker files are filtered out; ordering is whatever the store gave us.
    pub async fn list_children(&self, team_id: &str, rel: &str) -> Result<Listing> {
        let cache_key = format!("list_{team_id}_{}", path::normalize(rel));
        if let Some(listing) = self.list_cache.get(&cache_key) {
            self.log
                .push(format!("served cached listing of '{rel}' for team {team_id}"));
            return Ok(listing);
        }
        let children = self.list_level(team_id, rel).await?;
        let mut folders = Vec::with_capacity(children.prefixes.len());
        for prefix in &children.prefixes {
            folders.push(StorageEntry::folder(team_id, prefix)?);
        }
        let fetched = join_all(
            children
                .objects
                .iter()
                .map(|key| self.file_entry(team_id, key, true)),
        )
        .await;
        let mut files = Vec::with_capacity(fetched.len());
        for item in fetched {
            let item = item?;
            if !is_marker(&item.name) {
                files.push(item);
            }
        }
        self.log.push(format!(
            "listed '{}' for team {team_id}: {} folders, {} files",
            rel,
            folders.len(),
            files.len()
        ));
        let listing = Listing { folders, files };
        self.list_cache
            .set(cache_key, listing.clone(), LIST_CACHE_TTL);
        Ok(listing)
    }

    /// Folder names only, no metadata fetches at all.
    pub async fn list_folders_only(&self, team_id: &str, rel: &str) -> Result<Vec<StorageEntry>> {
        let children = self.list_level(team_id, rel).await?;
        children
            .prefixes
            .iter()
            .map(|prefix| StorageEntry::folder(team_id, prefix))
            .collect()
    }

    /// Files with metadata but without download URLs; URLs load lazily via
    /// [`TeamDrive::download_url`] when a file is actually opened.
    pub async fn list_files_basic(&self, team_id: &str, rel: &str) -> Result<Vec<StorageEntry>> {
        let children = self.list_level(team_id, rel).await?;
        let fetched = join_all(
            children
                .objects
                .iter()
                .map(|key| self.file_entry(team_id, key, false)),
        )
        .await;
        let mut files = Vec::with_capacity(fetched.len());
        for item in fetched {
            let item = item?;
            if !is_marker(&item.name) {
                files.push(item);
            }
        }
        Ok(files)
    }

    /// Download URL for a single file, by relative or full path.
    pub async fn download_url(&self, team_id: &str, file_path: &str) -> Result<String> {
        let key = self.full_key(team_id, file_path)?;
        if !self.call("exists", self.store.exists(&key)).await? {
            return Err(DriveError::NotFound(key));
        }
        self.call("download_url", self.store.download_url(&key)).await
    }

    /// Upload into a team folder. Overwrites silently if an object already
    /// exists at the target path; two concurrent uploads of the same name
    /// end last-write-wins with no warning.
    pub async fn upload(
        &self,
        team_id: &str,
        rel: &str,
        file_name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StorageEntry> {
        let name = path::normalize(file_name);
        if name.is_empty() || name.contains('/') {
            return Err(DriveError::InvalidName(file_name.to_string()));
        }
        let key = path::resolve(team_id, &format!("{rel}/{name}"))?;
        let size = data.len() as u64;
        self.call("upload", self.store.put(&key, data, content_type))
            .await?;
        self.invalidate_caches(team_id);
        self.log
            .push(format!("uploaded '{name}' ({size} bytes) to '{key}'"));
        self.refresh_after_write(team_id, rel, Some(&name)).await;
        Ok(StorageEntry {
            id: key.clone(),
            name: name.clone(),
            relative_path: path::relative_from(team_id, &key)?,
            full_path: key,
            team_id: team_id.to_string(),
            is_folder: false,
            mime_type: content_type.to_string(),
            size: Some(size),
            modified_time: Some(Utc::now().to_rfc3339()),
            download_url: None,
            has_error: false,
        })
    }

    /// "Create" an empty folder by writing a placeholder marker under it.
    /// The folder stays observable only as long as the marker survives.
    pub async fn create_folder(&self, team_id: &str, rel: &str) -> Result<StorageEntry> {
        let folder = path::normalize(rel);
        if folder.is_empty() {
            return Err(DriveError::Unsupported(
                "cannot create the team root; it exists implicitly".to_string(),
            ));
        }
        let folder_key = path::resolve(team_id, &folder)?;
        let marker_key = format!("{folder_key}/.keep");
        let body = placeholder_text(path::basename(&folder), team_id);
        self.call("upload", self.store.put(&marker_key, Bytes::from(body), "text/plain"))
            .await?;
        self.invalidate_caches(team_id);
        self.log.push(format!("created folder '{folder_key}'"));
        self.refresh_after_write(team_id, path::parent(&folder), None)
            .await;
        StorageEntry::folder(team_id, &folder_key)
    }

    /// Delete a single file. Missing objects are reported, not retried.
    pub async fn delete_file(&self, team_id: &str, file_path: &str) -> Result<String> {
        let key = self.full_key(team_id, file_path)?;
        if !self.call("exists", self.store.exists(&key)).await? {
            return Err(DriveError::NotFound(key));
        }
        self.call("delete", self.store.delete(&key)).await?;
        self.invalidate_caches(team_id);
        self.log.push(format!("deleted '{key}'"));
        Ok(key)
    }

    /// Recursively delete a folder: enumerate every object under the prefix,
    /// delete each individually, and report per-item outcomes. Partial
    /// failure leaves the rest in place for a follow-up attempt.
    pub async fn delete_folder(&self, team_id: &str, rel: &str) -> Result<FolderDeletion> {
        let folder = path::normalize(rel);
        let keys = self.collect_keys(team_id, folder.clone()).await?;
        let total = keys.len();
        let results = join_all(
            keys.iter()
                .map(|key| self.call("delete", self.store.delete(key))),
        )
        .await;
        let mut deleted = 0;
        let mut failed = 0;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(()) => deleted += 1,
                Err(err) => {
                    warn!(key, %err, "object delete failed");
                    failed += 1;
                }
            }
        }
        self.invalidate_caches(team_id);
        self.log.push(format!(
            "deleted folder '{folder}' for team {team_id}: {deleted} removed, {failed} failed of {total}"
        ));
        self.refresh_after_write(team_id, path::parent(&folder), None)
            .await;
        Ok(FolderDeletion {
            folder,
            team_id: team_id.to_string(),
            deleted,
            failed,
            total,
        })
    }

    /// Rename is not supported: the blob store has no atomic rename. Always
    /// fails fast instead of silently doing nothing or renaming halfway.
    pub fn rename(&self, _team_id: &str, from: &str, _to: &str, is_folder: bool) -> Result<()> {
        let advice = if is_folder {
            "a folder rename means re-uploading every object under the new prefix and deleting the old tree"
        } else {
            "copy the file to the new path and delete the original"
        };
        Err(DriveError::Unsupported(format!(
            "rename of '{from}' is not supported by the blob store; {advice}"
        )))
    }

    /// Provision the default folder set plus the team descriptor blob.
    /// Individual folder failures are logged and skipped; the result lists
    /// what was actually created.
    pub async fn create_team_structure(
        &self,
        team_id: &str,
        team_name: &str,
    ) -> Result<TeamProvisioning> {
        let base_path = path::team_root(team_id)?;
        let mut created = Vec::new();
        for folder in DEFAULT_FOLDERS {
            let marker_key = format!("{base_path}/{folder}/.keep");
            let body = placeholder_text(folder, team_name);
            match self
                .call("upload", self.store.put(&marker_key, Bytes::from(body), "text/plain"))
                .await
            {
                Ok(()) => {
                    created.push(folder.to_string());
                    self.log.push(format!("created folder '{folder}'"));
                }
                Err(err) => {
                    warn!(folder, %err, "folder provisioning failed; continuing");
                    self.log
                        .push(format!("failed to create folder '{folder}': {err}"));
                }
            }
        }

        let info = TeamInfo {
            team_id: team_id.to_string(),
            team_name: team_name.to_string(),
            created: Utc::now().to_rfc3339(),
            folders: created.clone(),
            version: TEAM_INFO_VERSION.to_string(),
        };
        let info_key = format!("{base_path}/{TEAM_INFO_NAME}");
        let body = serde_json::to_vec_pretty(&info)
            .map_err(|e| DriveError::Backend(e.into()))?;
        if let Err(err) = self
            .call("upload", self.store.put(&info_key, Bytes::from(body), "application/json"))
            .await
        {
            warn!(%err, "team descriptor write failed");
            self.log.push(format!("failed to write {TEAM_INFO_NAME}: {err}"));
        }

        self.invalidate_caches(team_id);
        self.log.push(format!(
            "storage structure created for team '{team_name}': {} folders",
            created.len()
        ));
        Ok(TeamProvisioning {
            team_id: team_id.to_string(),
            team_name: team_name.to_string(),
            folders: created,
            base_path,
        })
    }

    /// Does anything exist under the team root? Errors short of a missing
    /// team context degrade to "does not exist".
    pub async fn storage_exists(&self, team_id: &str) -> Result<StorageExists> {
        match self.list_level(team_id, "").await {
            Ok(children) => Ok(StorageExists {
                exists: !children.objects.is_empty() || !children.prefixes.is_empty(),
                files: children.objects.len(),
                folders: children.prefixes.len(),
            }),
            Err(DriveError::MissingTenant) => Err(DriveError::MissingTenant),
            Err(_) => Ok(StorageExists {
                exists: false,
                files: 0,
                folders: 0,
            }),
        }
    }

    /// Diagnostic ping: reachability plus raw counts at the team root.
    pub async fn test_connection(&self, team_id: &str) -> Result<ConnectionReport> {
        match self.list_level(team_id, "").await {
            Ok(children) => {
                self.log.push(format!(
                    "connection ok for team {team_id}: {} files, {} folders",
                    children.objects.len(),
                    children.prefixes.len()
                ));
                Ok(ConnectionReport {
                    ok: true,
                    team_id: team_id.to_string(),
                    files: children.objects.len(),
                    folders: children.prefixes.len(),
                    message: "connection successful".to_string(),
                })
            }
            Err(DriveError::MissingTenant) => Err(DriveError::MissingTenant),
            Err(err) => {
                self.log
                    .push(format!("connection failed for team {team_id}: {err}"));
                Ok(ConnectionReport {
                    ok: false,
                    team_id: team_id.to_string(),
                    files: 0,
                    folders: 0,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Full storage statistics: one walk over everything the team has.
    /// Expensive, so cached; `force` bypasses the cache.
    pub async fn stats(&self, team_id: &str, force: bool) -> Result<StorageStats> {
        let cache_key = format!("stats_{team_id}");
        if !force {
            if let Some(stats) = self.stats_cache.get(&cache_key) {
                self.log
                    .push(format!("served cached stats for team {team_id}"));
                return Ok(stats);
            }
        }
        let entries = self.walk(team_id, "").await?;
        let files = entries.iter().filter(|e| !e.is_folder).count();
        let folders = entries.iter().filter(|e| e.is_folder).count();
        let total_size = entries.iter().filter_map(|e| e.size).sum();
        let stats = StorageStats {
            team_id: team_id.to_string(),
            total_items: entries.len(),
            files,
            folders,
            total_size,
            last_updated: Utc::now().to_rfc3339(),
        };
        self.stats_cache
            .set(cache_key, stats.clone(), STATS_CACHE_TTL);
        self.log.push(format!(
            "stats for team {team_id}: {files} files, {folders} folders, {total_size} bytes"
        ));
        Ok(stats)
    }

    /// Root-level counts only; cheap enough to call on every page load.
    pub async fn quick_stats(&self, team_id: &str) -> Result<QuickStats> {
        let children = self.list_level(team_id, "").await?;
        Ok(QuickStats {
            team_id: team_id.to_string(),
            root_folders: children.prefixes.len(),
            root_files: children.objects.len(),
            has_content: !children.prefixes.is_empty() || !children.objects.is_empty(),
        })
    }

    /// Accept either a relative path or a full `teams/...` key.
    fn full_key(&self, team_id: &str, file_path: &str) -> Result<String> {
        let normalized = path::normalize(file_path);
        if normalized.starts_with("teams/") {
            // Re-resolve through the relative form so tenant checks apply.
            let rel = path::relative_from(team_id, &normalized)?;
            path::resolve(team_id, &rel)
        } else {
            path::resolve(team_id, &normalized)
        }
    }

    /// Propagation-lag workaround: wait a bit, then re-list the written
    /// level. Liveness only; a slow enough backend can still show stale
    /// state afterwards.
    async fn refresh_after_write(&self, team_id: &str, rel: &str, expect_name: Option<&str>) {
        if self.config.propagation_delay.is_zero() {
            return;
        }
        tokio::time::sleep(self.config.propagation_delay).await;
        match self.list_level(team_id, rel).await {
            Ok(children) => {
                if let Some(name) = expect_name {
                    let visible = children
                        .objects
                        .iter()
                        .any(|key| path::basename(key) == name);
                    if visible {
                        self.log
                            .push(format!("verified '{name}' visible after write"));
                    } else {
                        warn!(name, rel, "written object not yet visible after delay");
                        self.log
                            .push(format!("'{name}' not yet visible after write"));
                    }
                }
            }
            Err(err) => {
                self.log
                    .push(format!("post-write refresh of '{rel}' failed: {err}"));
            }
        }
    }
}

fn placeholder_text(folder: &str, owner: &str) -> String {
    format!(
        "# {folder}\n\nThis folder belongs to: {owner}\nCreated: {}\n\nThis placeholder keeps the folder visible while it has no real content.\n",
        Utc::now().to_rfc3339()
    )
}
