//! Offline cache worker
//!
//! `OfflineCacheManager` supplies the install, fetch and activate handlers.
//! `WorkerInstance` is the host side: it dispatches those events in
//! lifecycle order and tracks the instance state.

mod lifecycle;
mod manager;

pub use lifecycle::{Registration, WorkerInstance, WorkerState};
pub use manager::{
    ActivationReport, FetchOutcome, InstallReport, OfflineCacheManager, ResponseSource,
    WorkerSettings,
};
