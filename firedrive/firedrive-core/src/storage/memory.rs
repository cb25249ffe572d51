//! In-memory blob store for tests and local development.
//!
//! Keys are plain strings; prefixes are derived on the fly, so a "folder"
//! disappears the moment its last object does. Failure injection hooks let
//! tests exercise the degraded paths (per-item metadata failures, denied
//! roots, partial deletes) and phantom prefixes reproduce the transient
//! folder entries a real store can briefly report.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{BlobMeta, BlobStore, ChildList};

struct StoredBlob {
    data: Bytes,
    content_type: String,
    created: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    /// Prefixes reported as children even though no object exists under them.
    phantom_prefixes: RwLock<HashSet<String>>,
    /// Keys whose metadata fetch fails.
    fail_metadata: RwLock<HashSet<String>>,
    /// Keys whose delete fails.
    fail_delete: RwLock<HashSet<String>>,
    /// Prefixes whose listing fails (simulates permission denied).
    deny_list: RwLock<HashSet<String>>,
    delete_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_phantom_prefix(&self, prefix: &str) {
        self.phantom_prefixes.write().insert(prefix.to_string());
    }

    pub fn fail_metadata_for(&self, key: &str) {
        self.fail_metadata.write().insert(key.to_string());
    }

    pub fn fail_delete_for(&self, key: &str) {
        self.fail_delete.write().insert(key.to_string());
    }

    pub fn deny_prefix(&self, prefix: &str) {
        self.deny_list.write().insert(prefix.to_string());
    }

    /// Number of individual delete calls issued so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }

    /// Raw contents of an object, if present.
    pub fn data_of(&self, key: &str) -> Option<Bytes> {
        self.blobs.read().get(key).map(|b| b.data.clone())
    }

    pub fn key_count(&self) -> usize {
        self.blobs.read().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list_children(&self, prefix: &str) -> Result<ChildList> {
        if self.deny_list.read().contains(prefix) {
            bail!("permission denied for prefix '{prefix}'");
        }
        let lead = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let blobs = self.blobs.read();
        let mut prefixes = HashSet::new();
        let mut objects = Vec::new();
        for key in blobs.keys() {
            let Some(rest) = key.strip_prefix(&lead) else {
                continue;
            };
            match rest.split_once('/') {
                Some((first, _)) => {
                    prefixes.insert(format!("{lead}{first}"));
                }
                None => objects.push(key.clone()),
            }
        }
        for phantom in self.phantom_prefixes.read().iter() {
            if let Some(rest) = phantom.strip_prefix(&lead) {
                if !rest.is_empty() && !rest.contains('/') {
                    prefixes.insert(phantom.clone());
                }
            }
        }
        let mut prefixes: Vec<String> = prefixes.into_iter().collect();
        prefixes.sort();
        objects.sort();
        Ok(ChildList { prefixes, objects })
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMeta> {
        if self.fail_metadata.read().contains(key) {
            bail!("metadata fetch failed for '{key}'");
        }
        let blobs = self.blobs.read();
        let blob = blobs
            .get(key)
            .ok_or_else(|| anyhow!("object '{key}' not found"))?;
        Ok(BlobMeta {
            size: blob.data.len() as u64,
            content_type: Some(blob.content_type.clone()),
            created: Some(blob.created),
        })
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        if !self.blobs.read().contains_key(key) {
            bail!("object '{key}' not found");
        }
        Ok(format!("memory://{key}"))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.blobs.write().insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
                created: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_delete.read().contains(key) {
            bail!("delete failed for '{key}'");
        }
        self.blobs.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(key))
    }
}
