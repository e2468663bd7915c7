//! In-process cache storage
//!
//! Buckets live in an insertion-ordered list behind a tokio `RwLock`.
//! Used for embedding and as the reference backend in tests.

use crate::cache::storage::{ensure_cacheable, CacheStorage};
use crate::error::OffcacheResult;
use crate::network::{Request, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Bucket {
    name: String,
    /// Keyed by URL; only GET requests are stored
    entries: HashMap<String, Response>,
    /// URLs in first-put order
    order: Vec<String>,
}

/// Cache storage held in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<Vec<Bucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(buckets: &[Bucket], name: &str) -> Option<usize> {
        buckets.iter().position(|b| b.name == name)
    }

    fn open_locked<'a>(buckets: &'a mut Vec<Bucket>, name: &str) -> &'a mut Bucket {
        let index = match Self::position(buckets, name) {
            Some(index) => index,
            None => {
                buckets.push(Bucket {
                    name: name.to_string(),
                    ..Bucket::default()
                });
                buckets.len() - 1
            }
        };
        &mut buckets[index]
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> OffcacheResult<()> {
        let mut buckets = self.buckets.write().await;
        Self::open_locked(&mut buckets, name);
        Ok(())
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> OffcacheResult<()> {
        ensure_cacheable(request)?;

        let mut buckets = self.buckets.write().await;
        let bucket = Self::open_locked(&mut buckets, name);
        if bucket
            .entries
            .insert(request.url.clone(), response.clone())
            .is_none()
        {
            bucket.order.push(request.url.clone());
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &Request) -> OffcacheResult<Option<Response>> {
        if !request.is_cacheable() {
            return Ok(None);
        }

        let buckets = self.buckets.read().await;
        Ok(Self::position(&buckets, name)
            .and_then(|index| buckets[index].entries.get(&request.url))
            .cloned())
    }

    async fn keys(&self) -> OffcacheResult<Vec<String>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().map(|b| b.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> OffcacheResult<bool> {
        let mut buckets = self.buckets.write().await;
        match Self::position(&buckets, name) {
            Some(index) => {
                buckets.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn entries(&self, name: &str) -> OffcacheResult<Vec<String>> {
        let buckets = self.buckets.read().await;
        Ok(Self::position(&buckets, name)
            .map(|index| buckets[index].order.clone())
            .unwrap_or_default())
    }
}
