//! Depth-first traversal of a team's namespace.
//!
//! One listing round-trip per folder encountered; cost is O(folders), which
//! is fine for the tens-to-low-hundreds of folders a tenant actually has.

use futures::future::{join_all, BoxFuture};
use tracing::warn;

use crate::error::Result;
use crate::path;

use super::entry::StorageEntry;
use super::TeamDrive;

/// Recursion ceiling. Key depth is bounded by path length so there are no
/// cycles to detect, but adversarially deep trees would otherwise turn one
/// walk into thousands of round-trips.
pub(crate) const MAX_DEPTH: usize = 50;

impl TeamDrive {
    /// Flattened inventory of every file and folder strictly under `rel`.
    /// Files of a level come first, then each folder entry immediately
    /// followed by its own contents. Marker files are included; this is the
    /// raw view the stats and cleanup passes work from.
    pub async fn walk(&self, team_id: &str, rel: &str) -> Result<Vec<StorageEntry>> {
        let (entries, _) = self.walk_level(team_id, path::normalize(rel), 0).await?;
        Ok(entries)
    }

    /// As [`TeamDrive::walk`], but also reports the folders whose contents
    /// went unobserved because the depth cap cut the traversal short.
    /// Anything judging folders by what was (not) seen under them must treat
    /// those folders as unknown, not empty.
    pub(crate) async fn walk_tracking_truncation(
        &self,
        team_id: &str,
        rel: &str,
    ) -> Result<(Vec<StorageEntry>, Vec<String>)> {
        self.walk_level(team_id, path::normalize(rel), 0).await
    }

    fn walk_level<'a>(
        &'a self,
        team_id: &'a str,
        rel: String,
        depth: usize,
    ) -> BoxFuture<'a, Result<(Vec<StorageEntry>, Vec<String>)>> {
        Box::pin(async move {
            let children = self.list_level(team_id, &rel).await?;
            let mut out = Vec::new();
            let mut truncated = Vec::new();
            let fetched = join_all(
                children
                    .objects
                    .iter()
                    .map(|key| self.file_entry(team_id, key, false)),
            )
            .await;
            for item in fetched {
                out.push(item?);
            }
            for prefix in &children.prefixes {
                out.push(StorageEntry::folder(team_id, prefix)?);
                let sub = path::relative_from(team_id, prefix)?;
                if depth + 1 >= MAX_DEPTH {
                    warn!(prefix, "walk truncated at depth limit");
                    truncated.push(sub);
                    continue;
                }
                let (sub_entries, sub_truncated) =
                    self.walk_level(team_id, sub, depth + 1).await?;
                out.extend(sub_entries);
                truncated.extend(sub_truncated);
            }
            Ok((out, truncated))
        })
    }

    /// Every object key under a folder, flat. Recursive folder deletion only
    /// needs the raw keys, not synthetic folder entries or metadata.
    pub(crate) fn collect_keys<'a>(
        &'a self,
        team_id: &'a str,
        rel: String,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let children = self.list_level(team_id, &rel).await?;
            let mut keys = children.objects;
            for prefix in &children.prefixes {
                let sub = path::relative_from(team_id, prefix)?;
                keys.extend(self.collect_keys(team_id, sub).await?);
            }
            Ok(keys)
        })
    }
}
