//! Blob store backends.
//!
//! The drive only ever talks to the flat key namespace through [`BlobStore`].
//! Folder semantics (prefixes-as-directories, placeholder markers) are
//! derived above this trait and never leak into a backend.

pub mod memory;
pub mod s3;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One level of children under a prefix: sub-prefixes ("folders") and the
/// objects stored directly at that level. No ordering is guaranteed.
#[derive(Debug, Default, Clone)]
pub struct ChildList {
    /// Full prefixes, no trailing slash.
    pub prefixes: Vec<String>,
    /// Full object keys.
    pub objects: Vec<String>,
}

/// Metadata for a single object.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    pub size: u64,
    pub content_type: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List the immediate children of `prefix` (the prefix itself excluded).
    async fn list_children(&self, prefix: &str) -> Result<ChildList>;

    async fn get_metadata(&self, key: &str) -> Result<BlobMeta>;

    /// Opaque fetchable URL for the object.
    async fn download_url(&self, key: &str) -> Result<String>;

    /// Write an object, silently replacing any existing one at `key`.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}
