//! offcache - Offline asset cache for static sites
//!
//! Pre-caches a site's assets into a named cache bucket, serves requests
//! cache-first with a network fallback and purges buckets left by earlier
//! deployments.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod network;
pub mod ui;
pub mod worker;

pub use error::{OffcacheError, OffcacheResult};
