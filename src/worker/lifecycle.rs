//! Worker instance lifecycle
//!
//! The host owns the state machine; the manager only supplies handlers.
//!
//! ```text
//! parsed -> installing -> installed -> activating -> activated
//!               \
//!                +-> redundant (install failed)
//! ```

use crate::error::{OffcacheError, OffcacheResult};
use crate::network::Request;
use crate::worker::manager::{
    ActivationReport, FetchOutcome, InstallReport, OfflineCacheManager,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle state of one worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of registering a worker
#[derive(Debug, Clone)]
pub struct Registration {
    pub install: InstallReport,
    /// Present when the worker activated right after install
    pub activation: Option<ActivationReport>,
}

/// One worker instance driven through its lifecycle by the host
pub struct WorkerInstance {
    id: Uuid,
    state: WorkerState,
    manager: Arc<OfflineCacheManager>,
}

impl WorkerInstance {
    /// Create a freshly parsed worker
    pub fn new(manager: Arc<OfflineCacheManager>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WorkerState::Parsed,
            manager,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Install, then activate at once if install asked to skip waiting
    pub async fn register(&mut self) -> OffcacheResult<Registration> {
        let install = self.install().await?;

        let activation = if install.skip_waiting {
            Some(self.activate().await?)
        } else {
            None
        };

        Ok(Registration {
            install,
            activation,
        })
    }

    /// Dispatch the install event
    pub async fn install(&mut self) -> OffcacheResult<InstallReport> {
        self.install_with_progress(&|_: &str| {}).await
    }

    /// Dispatch the install event, reporting each pre-cached asset
    pub async fn install_with_progress(
        &mut self,
        on_asset: &(dyn Fn(&str) + Send + Sync),
    ) -> OffcacheResult<InstallReport> {
        self.expect(WorkerState::Parsed, "install")?;
        self.transition(WorkerState::Installing);

        match self.manager.install_with_progress(on_asset).await {
            Ok(report) => {
                self.transition(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                warn!(worker = %self.id, "Install failed: {}", e);
                self.transition(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Dispatch the activate event.
    ///
    /// The worker becomes active even if cleanup fails; the error is still
    /// returned to the host.
    pub async fn activate(&mut self) -> OffcacheResult<ActivationReport> {
        self.expect(WorkerState::Installed, "activate")?;
        self.transition(WorkerState::Activating);

        let result = self.manager.activate().await;
        self.transition(WorkerState::Activated);
        result
    }

    /// Dispatch a fetch event. Only an active worker controls requests.
    pub async fn fetch(&self, request: &Request) -> OffcacheResult<FetchOutcome> {
        self.expect(WorkerState::Activated, "fetch")?;
        self.manager.fetch(request).await
    }

    fn expect(&self, state: WorkerState, event: &str) -> OffcacheResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(OffcacheError::invalid_state(self.state, event))
        }
    }

    fn transition(&mut self, next: WorkerState) {
        info!(worker = %self.id, "{} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, MemoryStorage};
    use crate::worker::manager::tests::{settings, url, StubFetcher};

    fn instance(include: &[&str], routes: &[(&str, u16)]) -> (WorkerInstance, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = Arc::new(StubFetcher::with_routes(routes));
        let manager = OfflineCacheManager::new(settings(include, &[]), storage.clone(), fetcher);
        (WorkerInstance::new(Arc::new(manager)), storage)
    }

    #[tokio::test]
    async fn register_installs_then_activates() {
        let a = url("/a.css");
        let (mut worker, storage) = instance(&["/a.css"], &[(a.as_str(), 200)]);
        storage.open("stale").await.unwrap();

        let registration = worker.register().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);
        assert_eq!(registration.install.assets, vec![a]);

        let activation = registration.activation.unwrap();
        assert_eq!(activation.deleted, vec!["stale"]);
        assert!(!storage.has("stale").await.unwrap());
    }

    #[tokio::test]
    async fn failed_install_makes_worker_redundant() {
        let (mut worker, _) = instance(&["/missing.css"], &[]);

        assert!(worker.register().await.is_err());
        assert_eq!(worker.state(), WorkerState::Redundant);

        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, OffcacheError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn fetch_requires_active_worker() {
        let a = url("/a.css");
        let (mut worker, _) = instance(&[], &[(a.as_str(), 200)]);

        let err = worker.fetch(&Request::get(&a)).await.unwrap_err();
        assert_eq!(err.to_string(), "Worker cannot handle fetch while parsed");

        worker.register().await.unwrap();
        assert!(worker.fetch(&Request::get(&a)).await.is_ok());
    }

    #[tokio::test]
    async fn install_runs_once() {
        let (mut worker, _) = instance(&[], &[]);
        worker.install().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(worker.install().await.is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(WorkerState::Activating.to_string(), "activating");
        assert_eq!(WorkerState::Redundant.to_string(), "redundant");
    }
}
