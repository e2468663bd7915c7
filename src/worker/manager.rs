//! Offline cache manager: the install, fetch and activate handlers

use crate::cache::{CacheNamingPolicy, CacheStorage, Clock, SystemClock};
use crate::error::{OffcacheError, OffcacheResult};
use crate::manifest::AssetManifest;
use crate::network::{resolve_url, Fetcher, Request, Response};
use futures_util::future::{join_all, try_join_all};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Immutable settings fixed when the worker is created
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Include list and exclusion rules
    pub manifest: AssetManifest,
    /// How the current cache name is computed
    pub naming: CacheNamingPolicy,
    /// Site origin used to resolve relative URLs
    pub origin: Option<Url>,
}

/// Result of a successful install
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Bucket that was populated
    pub cache_name: String,
    /// Absolute URLs stored, in manifest order
    pub assets: Vec<String>,
    /// Install asks the host to activate without waiting for old workers
    pub skip_waiting: bool,
}

/// Where a fetch response came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from a cache bucket without touching the network
    Cache { bucket: String },
    /// Fetched from the network; `stored` tells whether a copy was cached
    Network { stored: bool },
}

/// Response returned by the fetch handler
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

impl FetchOutcome {
    pub fn from_cache(&self) -> bool {
        matches!(self.source, ResponseSource::Cache { .. })
    }
}

/// Result of activation
#[derive(Debug, Clone, Default)]
pub struct ActivationReport {
    /// The current cache name
    pub current: String,
    /// Stale buckets that were deleted
    pub deleted: Vec<String>,
    /// Stale buckets whose deletion failed, with the reason
    pub failed: Vec<(String, String)>,
}

/// Serves requests cache-first and keeps one bucket per deployment
pub struct OfflineCacheManager {
    settings: Arc<WorkerSettings>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
}

impl OfflineCacheManager {
    /// Create a manager using the system clock
    pub fn new(
        settings: WorkerSettings,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            storage,
            fetcher,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used by the date naming policy
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Name of the bucket for the current deployment
    pub fn cache_name(&self) -> String {
        self.settings.naming.cache_name(self.clock.as_ref())
    }

    /// Whether a URL must never be written to cache
    pub fn is_excluded(&self, url: &str) -> bool {
        self.settings.manifest.is_excluded(url)
    }

    /// Build a GET request for a manifest entry or user-supplied URL
    pub fn request_for(&self, entry: &str) -> OffcacheResult<Request> {
        resolve_url(self.settings.origin.as_ref(), entry).map(Request::get)
    }

    /// Install handler: pre-cache every include URL into the current bucket.
    pub async fn install(&self) -> OffcacheResult<InstallReport> {
        self.install_with_progress(&|_: &str| {}).await
    }

    /// Install handler reporting each asset as it arrives.
    ///
    /// Every asset is fetched before anything is written. One failed asset
    /// (network error or non-2xx status) fails the whole install and nothing
    /// is written. Exclusion rules do not apply here.
    pub async fn install_with_progress(
        &self,
        on_fetched: &(dyn Fn(&str) + Send + Sync),
    ) -> OffcacheResult<InstallReport> {
        let cache_name = self.cache_name();
        self.storage.open(&cache_name).await?;

        let requests = self
            .settings
            .manifest
            .unique_includes()
            .into_iter()
            .map(|entry| self.request_for(entry))
            .collect::<OffcacheResult<Vec<_>>>()?;

        info!(
            "Pre-caching {} asset(s) into {}",
            requests.len(),
            cache_name
        );

        let fetched = try_join_all(requests.iter().map(|request| async move {
            let response =
                self.fetcher
                    .fetch(request)
                    .await
                    .map_err(|e| OffcacheError::Precache {
                        url: request.url.clone(),
                        reason: e.to_string(),
                    })?;

            if !response.is_ok() {
                return Err(OffcacheError::Precache {
                    url: request.url.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }

            on_fetched(&request.url);
            Ok::<_, OffcacheError>((request, response))
        }))
        .await?;

        try_join_all(
            fetched
                .iter()
                .map(|(request, response)| self.storage.put(&cache_name, request, response)),
        )
        .await?;

        Ok(InstallReport {
            cache_name,
            assets: requests.into_iter().map(|r| r.url).collect(),
            skip_waiting: true,
        })
    }

    /// Fetch handler: cache first, then network.
    ///
    /// The lookup spans every bucket, so content in stale buckets keeps being
    /// served until activation removes them. Network errors reach the caller
    /// unchanged.
    pub async fn fetch(&self, request: &Request) -> OffcacheResult<FetchOutcome> {
        if request.is_cacheable() {
            match self.storage.match_any(request).await {
                Ok(Some(hit)) => {
                    debug!("Serving {} from cache {}", request.url, hit.bucket);
                    return Ok(FetchOutcome {
                        response: hit.response,
                        source: ResponseSource::Cache { bucket: hit.bucket },
                    });
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Cache lookup failed for {}, using network: {}",
                    request.url, e
                ),
            }
        }

        debug!("Fetching resource: {}", request);
        let response = self.fetcher.fetch(request).await?;
        let stored = self.store(request, &response).await;

        Ok(FetchOutcome {
            response,
            source: ResponseSource::Network { stored },
        })
    }

    /// Run the fetch handler for several requests concurrently
    pub async fn fetch_all(&self, requests: &[Request]) -> Vec<OffcacheResult<FetchOutcome>> {
        join_all(requests.iter().map(|request| self.fetch(request))).await
    }

    /// Store a network response in the current bucket.
    ///
    /// Write failures are logged and swallowed; the caller still gets the
    /// response.
    async fn store(&self, request: &Request, response: &Response) -> bool {
        if !request.is_cacheable() || !response.is_ok() || self.is_excluded(&request.url) {
            return false;
        }

        let cache_name = self.cache_name();
        let result = async {
            self.storage.open(&cache_name).await?;
            self.storage.put(&cache_name, request, response).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!("Caching new resource: {} in {}", request.url, cache_name);
                true
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", request.url, e);
                false
            }
        }
    }

    /// Activate handler: delete every bucket except the current one.
    ///
    /// Deletions run concurrently and independently; a failed deletion is
    /// reported but does not stop the others.
    pub async fn activate(&self) -> OffcacheResult<ActivationReport> {
        let current = self.cache_name();
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|key| *key != current)
            .collect();

        let results = join_all(stale.iter().map(|name| async move {
            (name, self.storage.delete(name).await)
        }))
        .await;

        let mut report = ActivationReport {
            current,
            ..ActivationReport::default()
        };
        for (name, result) in results {
            match result {
                Ok(_) => report.deleted.push(name.clone()),
                Err(e) => {
                    warn!("Failed to delete stale cache {}: {}", name, e);
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Activated cache {} ({} stale removed)",
            report.current,
            report.deleted.len()
        );
        Ok(report)
    }
}
