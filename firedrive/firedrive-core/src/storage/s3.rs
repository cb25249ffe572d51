//! S3-compatible blob store backend.
//!
//! Delimiter listings map directly onto the prefix/object split the drive
//! expects; download URLs are presigned GETs.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{BlobMeta, BlobStore, ChildList};

const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn list_children(&self, prefix: &str) -> Result<ChildList> {
        let lead = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let mut out = ChildList::default();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&lead)
            .delimiter("/")
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.context("list_objects_v2 failed")?;
            for cp in page.common_prefixes() {
                if let Some(p) = cp.prefix() {
                    out.prefixes.push(p.trim_end_matches('/').to_string());
                }
            }
            for obj in page.contents() {
                if let Some(key) = obj.key() {
                    // The lead prefix itself can come back as a zero-byte key.
                    if key != lead {
                        out.objects.push(key.to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    async fn get_metadata(&self, key: &str) -> Result<BlobMeta> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("head_object failed for '{key}'"))?;
        let created = head
            .last_modified()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos()));
        Ok(BlobMeta {
            size: head.content_length().unwrap_or(0).max(0) as u64,
            content_type: head.content_type().map(str::to_string),
            created,
        })
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(self.url_ttl)?)
            .await
            .with_context(|| format!("presign failed for '{key}'"))?;
        Ok(presigned.uri().to_string())
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("put_object failed for '{key}'"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete_object failed for '{key}'"))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(err).with_context(|| format!("head_object failed for '{key}'"))
                }
            }
        }
    }
}
