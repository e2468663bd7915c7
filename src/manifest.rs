//! Asset manifest: the pre-cache include list and the exclusion rules
//!
//! The manifest is produced by the site build (`cache-list.json` or a TOML
//! equivalent) or written inline in the config. It is immutable once loaded.

use crate::error::{OffcacheError, OffcacheResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Include list and exclusion rule set for one site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    /// URLs pre-cached at install time, in order
    pub include: Vec<String>,

    /// Substring patterns; a matching URL is never written to cache
    pub exclude: Vec<String>,
}

impl AssetManifest {
    /// Create a manifest from include and exclude lists
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Whether `url` contains any exclusion pattern.
    ///
    /// Plain case-sensitive substring containment. No anchoring, no wildcards.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude.iter().any(|rule| url.contains(rule.as_str()))
    }

    /// Include entries with duplicates removed, first occurrence wins
    pub fn unique_includes(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.include
            .iter()
            .map(String::as_str)
            .filter(|entry| seen.insert(*entry))
            .collect()
    }

    /// Load a generated manifest file, choosing the format by extension
    pub async fn from_file(path: &Path) -> OffcacheResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            OffcacheError::io(format!("reading asset manifest {}", path.display()), e)
        })?;

        let manifest = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&content),
            Some("toml") => Self::parse_toml(&content),
            _ => Err(format!(
                "unsupported manifest format (expected .json or .toml): {}",
                path.display()
            )),
        }
        .map_err(|reason| OffcacheError::ManifestInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        debug!(
            "Loaded manifest {}: {} include, {} exclude",
            path.display(),
            manifest.include.len(),
            manifest.exclude.len()
        );
        Ok(manifest)
    }

    fn parse_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    fn parse_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(exclude: &[&str]) -> AssetManifest {
        AssetManifest::new(
            vec![],
            exclude.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn excluded_by_substring() {
        let m = manifest(&["/b.js", "google-analytics"]);
        assert!(m.is_excluded("https://blog.example.com/b.js"));
        assert!(m.is_excluded("https://www.google-analytics.com/collect?v=1"));
        assert!(m.is_excluded("https://blog.example.com/b.js?v=2"));
        assert!(!m.is_excluded("https://blog.example.com/a.css"));
    }

    #[test]
    fn exclusion_is_case_sensitive() {
        let m = manifest(&["/B.js"]);
        assert!(!m.is_excluded("https://blog.example.com/b.js"));
    }

    #[test]
    fn empty_rule_set_excludes_nothing() {
        let m = manifest(&[]);
        assert!(!m.is_excluded("https://blog.example.com/anything"));
    }

    #[test]
    fn unique_includes_keeps_first_order() {
        let m = AssetManifest::new(
            vec!["/a.css".into(), "/b.js".into(), "/a.css".into()],
            vec![],
        );
        assert_eq!(m.unique_includes(), vec!["/a.css", "/b.js"]);
    }

    #[tokio::test]
    async fn load_json_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-list.json");
        std::fs::write(
            &path,
            r#"{"include": ["/", "/assets/css/style.css"], "exclude": ["/assets/js/data/"]}"#,
        )
        .unwrap();

        let m = AssetManifest::from_file(&path).await.unwrap();
        assert_eq!(m.include, vec!["/", "/assets/css/style.css"]);
        assert_eq!(m.exclude, vec!["/assets/js/data/"]);
    }

    #[tokio::test]
    async fn load_toml_manifest_with_missing_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-list.toml");
        std::fs::write(&path, "include = [\"/feed.xml\"]\n").unwrap();

        let m = AssetManifest::from_file(&path).await.unwrap();
        assert_eq!(m.include, vec!["/feed.xml"]);
        assert!(m.exclude.is_empty());
    }

    #[tokio::test]
    async fn load_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-list.js");
        std::fs::write(&path, "const include = [];").unwrap();

        let err = AssetManifest::from_file(&path).await.unwrap_err();
        assert!(matches!(err, OffcacheError::ManifestInvalid { .. }));
    }
}
