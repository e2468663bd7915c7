//! Cache storage abstraction
//!
//! Mirrors the host cache API: named buckets mapping GET requests to stored
//! responses. Backends serialize their own writes, so the cache manager can
//! share one storage across concurrent fetches without extra locking.

use crate::error::{OffcacheError, OffcacheResult};
use crate::network::{Request, Response};
use async_trait::async_trait;

/// A cache hit: the bucket that answered and the stored response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMatch {
    pub bucket: String,
    pub response: Response,
}

/// Abstract cache storage interface
///
/// Implemented by `MemoryStorage` (in-process) and `DiskStorage` (persistent).
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist
    async fn open(&self, name: &str) -> OffcacheResult<()>;

    /// Store a response for a GET request, replacing any previous entry.
    /// Creates the bucket if needed.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> OffcacheResult<()>;

    /// Exact lookup in one bucket
    async fn match_in(&self, name: &str, request: &Request) -> OffcacheResult<Option<Response>>;

    /// Bucket names in creation order
    async fn keys(&self) -> OffcacheResult<Vec<String>>;

    /// Delete a bucket and everything in it. Returns whether it existed.
    async fn delete(&self, name: &str) -> OffcacheResult<bool>;

    /// URLs stored in a bucket
    async fn entries(&self, name: &str) -> OffcacheResult<Vec<String>>;

    /// Lookup across every bucket, oldest first
    async fn match_any(&self, request: &Request) -> OffcacheResult<Option<CacheMatch>> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        for bucket in self.keys().await? {
            if let Some(response) = self.match_in(&bucket, request).await? {
                return Ok(Some(CacheMatch { bucket, response }));
            }
        }
        Ok(None)
    }

    /// Whether a bucket exists
    async fn has(&self, name: &str) -> OffcacheResult<bool> {
        Ok(self.keys().await?.iter().any(|key| key == name))
    }
}

/// Reject requests the cache cannot hold
pub(crate) fn ensure_cacheable(request: &Request) -> OffcacheResult<()> {
    if request.is_cacheable() {
        Ok(())
    } else {
        Err(OffcacheError::UnsupportedMethod {
            method: request.method.to_string(),
        })
    }
}
