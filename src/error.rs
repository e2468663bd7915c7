//! Error types for offcache
//!
//! All modules use `OffcacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for offcache operations
pub type OffcacheResult<T> = Result<T, OffcacheError>;

/// All errors that can occur in offcache
#[derive(Error, Debug)]
pub enum OffcacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build naming policy requires cache.build_stamp to be set")]
    MissingBuildStamp,

    #[error("Invalid build stamp '{stamp}': expected YYYYMMDD.HHMMSS")]
    InvalidBuildStamp { stamp: String },

    #[error("No site origin configured; relative asset '{0}' cannot be resolved")]
    MissingOrigin(String),

    // Manifest errors
    #[error("Invalid asset manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // Network errors
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network request failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to pre-cache {url}: {reason}")]
    Precache { url: String, reason: String },

    // Cache storage errors
    #[error("Cache does not support {method} requests")]
    UnsupportedMethod { method: String },

    #[error("Corrupt cache entry in bucket {bucket}: {reason}")]
    CacheCorrupt { bucket: String, reason: String },

    // Lifecycle errors
    #[error("Worker cannot handle {event} while {state}")]
    InvalidState { state: String, event: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl OffcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state error for a lifecycle event
    pub fn invalid_state(state: impl ToString, event: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.to_string(),
            event: event.into(),
        }
    }

    /// Whether the error came from the network rather than local state
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Precache { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingBuildStamp => Some("Run: offcache stamp --write"),
            Self::InvalidBuildStamp { .. } => Some("Run: offcache stamp --write"),
            Self::MissingOrigin(_) => Some("Set site.origin in your config"),
            Self::ConfigNotFound(_) => Some("Run: offcache config init"),
            Self::Precache { .. } => Some("Check that every manifest include URL is reachable"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = OffcacheError::network("https://example.com/a.css", "connection refused");
        assert_eq!(
            err.to_string(),
            "Network request failed for https://example.com/a.css: connection refused"
        );
    }

    #[test]
    fn error_hint() {
        assert_eq!(
            OffcacheError::MissingBuildStamp.hint(),
            Some("Run: offcache stamp --write")
        );
        assert_eq!(OffcacheError::Internal("x".to_string()).hint(), None);
    }

    #[test]
    fn error_is_network() {
        assert!(OffcacheError::network("u", "r").is_network());
        assert!(!OffcacheError::MissingBuildStamp.is_network());
    }

    #[test]
    fn invalid_state_display() {
        let err = OffcacheError::invalid_state("installing", "fetch");
        assert_eq!(err.to_string(), "Worker cannot handle fetch while installing");
    }
}
