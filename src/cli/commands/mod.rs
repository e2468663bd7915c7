//! CLI command implementations

pub mod activate;
pub mod config;
pub mod fetch;
pub mod install;
pub mod list;
pub mod name;
pub mod stamp;

pub use activate::execute as activate;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use list::execute as list;
pub use name::execute as name;
pub use stamp::execute as stamp;

use crate::cache::DiskStorage;
use crate::config::Config;
use crate::error::OffcacheResult;
use crate::network::{parse_origin, HttpFetcher};
use crate::worker::{OfflineCacheManager, WorkerSettings};
use std::sync::Arc;
use tracing::debug;

/// Disk storage rooted at `cache.dir` or the platform cache directory
pub(crate) fn open_storage(config: &Config) -> DiskStorage {
    let root = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(DiskStorage::default_root);
    debug!("Cache storage at {}", root.display());
    DiskStorage::new(root)
}

/// Build the cache manager described by the configuration
pub(crate) async fn build_manager(config: &Config) -> OffcacheResult<OfflineCacheManager> {
    let origin = config
        .site
        .origin
        .as_deref()
        .map(parse_origin)
        .transpose()?;

    let settings = WorkerSettings {
        manifest: config.manifest.load().await?,
        naming: config.cache.naming_policy()?,
        origin,
    };

    Ok(OfflineCacheManager::new(
        settings,
        Arc::new(open_storage(config)),
        Arc::new(HttpFetcher::new(config.site.user_agent.clone())),
    ))
}
