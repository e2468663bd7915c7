//! Configuration management for offcache

pub mod schema;

pub use schema::Config;

use crate::error::{OffcacheError, OffcacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of project-local configuration
pub const LOCAL_CONFIG_FILE: &str = ".offcache.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offcache")
            .join("config.toml")
    }

    /// Search `start` and its ancestors for a project-local config
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> OffcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> OffcacheResult<Config> {
        let table = Self::read_anchored(path).await?;
        Self::from_table(path, table)
    }

    /// Load global configuration overlaid with a project-local file
    pub async fn load_merged(&self, local: Option<&Path>) -> OffcacheResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut base = if self.config_path.exists() {
            Self::read_anchored(&self.config_path).await?
        } else {
            toml::Table::new()
        };

        let overlay = Self::read_anchored(local).await?;
        merge_tables(&mut base, overlay);
        debug!("Merged local config {}", local.display());

        Self::from_table(local, base)
    }

    async fn read_table(path: &Path) -> OffcacheResult<toml::Table> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            OffcacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        content
            .parse::<toml::Table>()
            .map_err(|e| OffcacheError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Read a config file with its relative paths made relative to the
    /// file's own directory
    async fn read_anchored(path: &Path) -> OffcacheResult<toml::Table> {
        let mut table = Self::read_table(path).await?;
        if let Some(dir) = path.parent() {
            for (section, key) in ANCHORED_PATHS {
                anchor_path(&mut table, section, key, dir);
            }
        }
        Ok(table)
    }

    fn from_table(path: &Path, table: toml::Table) -> OffcacheResult<Config> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| OffcacheError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> OffcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            OffcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set one `section.key` in a config file, keeping every other value.
    ///
    /// The file is created if missing.
    pub async fn set_value(
        path: &Path,
        section: &str,
        key: &str,
        value: toml::Value,
    ) -> OffcacheResult<()> {
        let mut table = if path.exists() {
            Self::read_table(path).await?
        } else {
            toml::Table::new()
        };

        let mut overlay = toml::Table::new();
        overlay.insert(key.to_string(), value);
        let mut wrapper = toml::Table::new();
        wrapper.insert(section.to_string(), toml::Value::Table(overlay));
        merge_tables(&mut table, wrapper);

        // Validate before writing so a bad value never lands on disk
        Self::from_table(path, table.clone())?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OffcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(&table)?;
        fs::write(path, content)
            .await
            .map_err(|e| OffcacheError::io(format!("writing config to {}", path.display()), e))?;

        debug!("Set {}.{} in {}", section, key, path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> OffcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OffcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Path-valued keys resolved against the directory of the file that sets them
const ANCHORED_PATHS: [(&str, &str); 2] = [("manifest", "path"), ("cache", "dir")];

fn anchor_path(table: &mut toml::Table, section: &str, key: &str, dir: &Path) {
    let Some(toml::Value::Table(entries)) = table.get_mut(section) else {
        return;
    };
    let Some(toml::Value::String(value)) = entries.get_mut(key) else {
        return;
    };
    let path = Path::new(value.as_str());
    if path.is_relative() {
        *value = dir.join(path).to_string_lossy().into_owned();
    }
}

/// Overlay `overlay` onto `base`; nested tables merge, other values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let incoming = match value {
            toml::Value::Table(incoming) => incoming,
            other => {
                base.insert(key, other);
                continue;
            }
        };

        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PolicyKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.prefix, "offcache");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.policy = PolicyKind::Build;
        config.cache.build_stamp = Some("20240601.120000".to_string());

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.policy, PolicyKind::Build);
        assert_eq!(loaded.cache.build_stamp.as_deref(), Some("20240601.120000"));
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache\npolicy = ").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, OffcacheError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[tokio::test]
    async fn local_config_overrides_global_by_key() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        std::fs::write(
            &global,
            "[site]\norigin = \"https://global.example.com\"\nuser_agent = \"global-agent\"\n",
        )
        .unwrap();

        let project = temp.path().join("blog");
        std::fs::create_dir_all(project.join("_site")).unwrap();
        std::fs::write(
            project.join(LOCAL_CONFIG_FILE),
            "[site]\norigin = \"https://blog.example.com\"\n[manifest]\nexclude = [\"/b.js\"]\n",
        )
        .unwrap();

        let local = ConfigManager::find_local_config(&project.join("_site")).unwrap();
        let config = ConfigManager::with_path(global)
            .load_merged(Some(&local))
            .await
            .unwrap();

        assert_eq!(config.site.origin.as_deref(), Some("https://blog.example.com"));
        assert_eq!(config.site.user_agent, "global-agent");
        assert_eq!(config.manifest.exclude, vec!["/b.js"]);
    }

    #[tokio::test]
    async fn set_value_keeps_other_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(
            &path,
            "[site]\norigin = \"https://blog.example.com\"\n[cache]\npolicy = \"build\"\n",
        )
        .unwrap();

        ConfigManager::set_value(
            &path,
            "cache",
            "build_stamp",
            toml::Value::String("20240601.120000".to_string()),
        )
        .await
        .unwrap();

        let config = ConfigManager::with_path(path).load().await.unwrap();
        assert_eq!(config.site.origin.as_deref(), Some("https://blog.example.com"));
        assert_eq!(config.cache.policy, PolicyKind::Build);
        assert_eq!(config.cache.build_stamp.as_deref(), Some("20240601.120000"));
    }

    #[tokio::test]
    async fn set_value_rejects_invalid_type() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let err = ConfigManager::set_value(&path, "cache", "policy", toml::Value::Integer(3))
            .await
            .unwrap_err();
        assert!(matches!(err, OffcacheError::ConfigInvalid { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn relative_paths_follow_the_file_that_sets_them() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global").join("config.toml");
        std::fs::create_dir_all(global.parent().unwrap()).unwrap();
        std::fs::write(&global, "[cache]\ndir = \"buckets\"\n").unwrap();

        let project = temp.path().join("blog");
        let nested = project.join("_posts").join("2024");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            project.join(LOCAL_CONFIG_FILE),
            "[manifest]\npath = \"_site/offcache.json\"\n",
        )
        .unwrap();

        let local = ConfigManager::find_local_config(&nested).unwrap();
        let config = ConfigManager::with_path(global.clone())
            .load_merged(Some(&local))
            .await
            .unwrap();

        assert_eq!(
            config.manifest.path,
            Some(project.join("_site/offcache.json"))
        );
        assert_eq!(config.cache.dir, Some(temp.path().join("global").join("buckets")));
    }

    #[tokio::test]
    async fn absolute_paths_are_kept() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manifest = temp.path().join("elsewhere").join("manifest.toml");
        std::fs::write(
            &path,
            format!("[manifest]\npath = '{}'\n", manifest.display()),
        )
        .unwrap();

        let config = ConfigManager::with_path(path).load().await.unwrap();
        assert_eq!(config.manifest.path, Some(manifest));
    }

    #[test]
    fn find_local_config_none() {
        let temp = TempDir::new().unwrap();
        // tempdir ancestors are system directories without .offcache.toml
        assert!(ConfigManager::find_local_config(temp.path()).is_none());
    }
}
