//! Persistent cache storage on the local filesystem
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<bucket digest>/bucket.json      bucket name + creation time
//! <root>/<bucket digest>/<url digest>.json entry metadata
//! <root>/<bucket digest>/<url digest>.body raw response body
//! ```
//!
//! Directory and file names are SHA-256 digests, so bucket names and URLs
//! never need escaping. Every file is written to a unique temp file and
//! renamed into place; the metadata file is written last and marks the entry
//! as complete.

use crate::cache::storage::{ensure_cacheable, CacheStorage};
use crate::error::{OffcacheError, OffcacheResult};
use crate::network::{Method, Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const BUCKET_FILE: &str = "bucket.json";

/// Bucket descriptor stored in `bucket.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketMeta {
    name: String,
    created_at: DateTime<Utc>,
}

/// Entry metadata stored next to the body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    method: Method,
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    headers: Vec<(String, String)>,
    stored_at: DateTime<Utc>,
}

/// Short hex digest used for on-disk names
fn digest(input: &str, bytes: usize) -> String {
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..bytes])
}

/// Cache storage persisted under a root directory
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Use `root` as the storage directory (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default storage root (`~/.cache/offcache/buckets`)
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offcache")
            .join("buckets")
    }

    fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(digest(name, 8))
    }

    fn entry_paths(&self, name: &str, url: &str) -> (PathBuf, PathBuf) {
        let dir = self.bucket_dir(name);
        let key = digest(url, 16);
        (
            dir.join(format!("{}.json", key)),
            dir.join(format!("{}.body", key)),
        )
    }

    /// Write via a unique temp file and rename
    async fn write_atomic(path: &Path, contents: &[u8]) -> OffcacheResult<()> {
        let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&temp_path, contents)
            .await
            .map_err(|e| OffcacheError::io(format!("writing {}", temp_path.display()), e))?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(OffcacheError::io(format!("renaming into {}", path.display()), e));
        }
        Ok(())
    }

    async fn read_bucket_meta(dir: &Path) -> OffcacheResult<Option<BucketMeta>> {
        let path = dir.join(BUCKET_FILE);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OffcacheError::io(format!("reading {}", path.display()), e)),
        }
    }

    async fn read_entry_meta(path: &Path) -> OffcacheResult<Option<EntryMeta>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OffcacheError::io(format!("reading {}", path.display()), e)),
        }
    }

    /// All buckets with their metadata, oldest first
    async fn buckets(&self) -> OffcacheResult<Vec<BucketMeta>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(OffcacheError::io(
                    format!("listing {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut buckets = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| OffcacheError::io(format!("listing {}", self.root.display()), e))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match Self::read_bucket_meta(&path).await {
                Ok(Some(meta)) => buckets.push(meta),
                Ok(None) => debug!("Ignoring directory without bucket metadata: {}", path.display()),
                Err(e) => warn!("Skipping unreadable bucket {}: {}", path.display(), e),
            }
        }

        buckets.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(buckets)
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> OffcacheResult<()> {
        let dir = self.bucket_dir(name);
        if Self::read_bucket_meta(&dir).await?.is_some() {
            return Ok(());
        }

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| OffcacheError::io(format!("creating bucket {}", dir.display()), e))?;

        let meta = BucketMeta {
            name: name.to_string(),
            created_at: Utc::now(),
        };
        Self::write_atomic(&dir.join(BUCKET_FILE), &serde_json::to_vec_pretty(&meta)?).await?;

        debug!("Created cache bucket {} at {}", name, dir.display());
        Ok(())
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> OffcacheResult<()> {
        ensure_cacheable(request)?;
        self.open(name).await?;

        let (meta_path, body_path) = self.entry_paths(name, &request.url);
        let meta = EntryMeta {
            url: request.url.clone(),
            method: request.method,
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            stored_at: Utc::now(),
        };

        Self::write_atomic(&body_path, &response.body).await?;
        Self::write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?).await?;
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &Request) -> OffcacheResult<Option<Response>> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        let (meta_path, body_path) = self.entry_paths(name, &request.url);
        let Some(meta) = Self::read_entry_meta(&meta_path).await? else {
            return Ok(None);
        };

        let body = fs::read(&body_path)
            .await
            .map_err(|e| OffcacheError::CacheCorrupt {
                bucket: name.to_string(),
                reason: format!("missing body for {}: {}", meta.url, e),
            })?;

        Ok(Some(Response {
            url: meta.url,
            status: meta.status,
            status_text: meta.status_text,
            headers: meta.headers,
            body,
        }))
    }

    async fn keys(&self) -> OffcacheResult<Vec<String>> {
        Ok(self.buckets().await?.into_iter().map(|b| b.name).collect())
    }

    async fn delete(&self, name: &str) -> OffcacheResult<bool> {
        let dir = self.bucket_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted cache bucket {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(OffcacheError::io(format!("deleting bucket {}", name), e)),
        }
    }

    async fn entries(&self, name: &str) -> OffcacheResult<Vec<String>> {
        let dir = self.bucket_dir(name);
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OffcacheError::io(format!("listing bucket {}", name), e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| OffcacheError::io(format!("listing bucket {}", name), e))?
        {
            let path = entry.path();
            let is_entry = path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|f| f != BUCKET_FILE);
            if !is_entry {
                continue;
            }
            if let Some(meta) = Self::read_entry_meta(&path).await? {
                entries.push(meta);
            }
        }

        entries.sort_by(|a, b| a.stored_at.cmp(&b.stored_at));
        Ok(entries.into_iter().map(|meta| meta.url).collect())
    }
}
