//! Configuration schema for offcache
//!
//! Global configuration is stored at `~/.config/offcache/config.toml`.
//! A project may add `.offcache.toml`, which overrides it key by key.

use crate::cache::{CacheNamingPolicy, PolicyKind};
use crate::error::OffcacheResult;
use crate::manifest::AssetManifest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// The site whose assets are cached
    pub site: SiteConfig,

    /// Pre-cache and exclusion lists
    pub manifest: ManifestConfig,

    /// Cache naming and storage
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin used to resolve site-relative URLs (e.g. https://blog.example.com)
    pub origin: Option<String>,

    /// User-Agent sent with network requests
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: None,
            user_agent: format!("offcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Manifest settings
///
/// When `path` is set the generated manifest file replaces the inline lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Generated manifest file (.json or .toml)
    pub path: Option<PathBuf>,

    /// URLs to pre-cache at install time
    pub include: Vec<String>,

    /// Substring patterns never written to cache
    pub exclude: Vec<String>,
}

impl ManifestConfig {
    /// Resolve the manifest, reading the generated file if configured
    pub async fn load(&self) -> OffcacheResult<AssetManifest> {
        match &self.path {
            Some(path) => AssetManifest::from_file(path).await,
            None => Ok(AssetManifest::new(
                self.include.clone(),
                self.exclude.clone(),
            )),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Naming policy: "date" or "build"
    pub policy: PolicyKind,

    /// Prefix for build-stamped cache names
    pub prefix: String,

    /// Build stamp (YYYYMMDD.HHMMSS), required by the build policy
    pub build_stamp: Option<String>,

    /// Storage directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Date,
            prefix: "offcache".to_string(),
            build_stamp: None,
            dir: None,
        }
    }
}

impl CacheConfig {
    /// Build the naming policy, validating the build stamp
    pub fn naming_policy(&self) -> OffcacheResult<CacheNamingPolicy> {
        CacheNamingPolicy::from_parts(self.policy, &self.prefix, self.build_stamp.as_deref())
    }
}
