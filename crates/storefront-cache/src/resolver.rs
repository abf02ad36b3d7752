//! One-time backend selection.
//!
//! ## Resolution
//!
//! ```text
//! Unresolved ──(no remote configured)──────────────────────→ InProcess
//!     │
//!     └──(remote configured)→ create client → connect ──ok──→ Remote
//!                                  │              │
//!                                  └─────err──────┴─────────→ InProcess
//! ```
//!
//! Resolution runs lazily on the first cache operation, exactly once per
//! instance: concurrent first callers await the same attempt. Both outcomes
//! are terminal. An instance that fell back stays in-process until the
//! process restarts, so a down remote store is never retried per request.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::backend::{
    BackendMode, CacheBackend, InMemoryBackend, RemoteBackend, RemoteClientFactory,
};
use crate::config::{CacheSettings, RemoteStoreConfig};

/// The backend an instance resolved to.
#[derive(Clone)]
pub enum ActiveBackend {
    Remote(Arc<RemoteBackend>),
    InProcess(Arc<InMemoryBackend>),
}

impl ActiveBackend {
    pub fn mode(&self) -> BackendMode {
        match self {
            ActiveBackend::Remote(_) => BackendMode::Remote,
            ActiveBackend::InProcess(_) => BackendMode::InProcess,
        }
    }

    pub fn backend(&self) -> &dyn CacheBackend {
        match self {
            ActiveBackend::Remote(remote) => remote.as_ref(),
            ActiveBackend::InProcess(local) => local.as_ref(),
        }
    }

    /// The in-process store, when that is what the instance resolved to.
    pub fn local(&self) -> Option<&Arc<InMemoryBackend>> {
        match self {
            ActiveBackend::Remote(_) => None,
            ActiveBackend::InProcess(local) => Some(local),
        }
    }
}

/// Decides once whether an instance uses the remote store or process memory.
pub struct BackendResolver {
    remote: Option<RemoteStoreConfig>,
    factory: Arc<dyn RemoteClientFactory>,
    sweep_interval: Option<Duration>,
    active: OnceCell<ActiveBackend>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl BackendResolver {
    pub fn new(settings: &CacheSettings, factory: Arc<dyn RemoteClientFactory>) -> Self {
        Self {
            remote: settings.remote.clone(),
            factory,
            sweep_interval: settings.sweep_interval(),
            active: OnceCell::new(),
            sweeper: Mutex::new(None),
        }
    }

    /// Resolve the backend, running the attempt if this is the first call.
    pub async fn resolve(&self) -> &ActiveBackend {
        self.active.get_or_init(|| self.attempt()).await
    }

    /// The resolved backend, without triggering resolution.
    pub fn resolved(&self) -> Option<&ActiveBackend> {
        self.active.get()
    }

    pub fn mode(&self) -> BackendMode {
        self.resolved()
            .map(ActiveBackend::mode)
            .unwrap_or(BackendMode::Unresolved)
    }

    /// Stop the sweeper and close the resolved backend, if any.
    pub async fn close(&self) {
        self.stop_sweeper();
        if let Some(active) = self.active.get() {
            active.backend().close().await;
        }
    }

    async fn attempt(&self) -> ActiveBackend {
        let Some(config) = self.remote.as_ref() else {
            tracing::info!("No remote cache store configured, using in-process cache");
            return self.in_process();
        };

        tracing::info!(url = %config.display_url(), "Connecting to remote cache store");

        let client = match self.factory.create(config) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(
                    operation = "resolve",
                    url = %config.display_url(),
                    error = %e,
                    "Failed to create remote cache client. Falling back to in-process cache."
                );
                return self.in_process();
            }
        };

        let remote = RemoteBackend::new(client, config);
        match remote.connect().await {
            Ok(()) => {
                tracing::info!(url = %config.display_url(), "Connected to remote cache store");
                ActiveBackend::Remote(Arc::new(remote))
            }
            Err(e) => {
                tracing::error!(
                    operation = "resolve",
                    url = %config.display_url(),
                    error = %e,
                    "Failed to connect to remote cache store. Falling back to in-process cache."
                );
                remote.close().await;
                self.in_process()
            }
        }
    }

    fn in_process(&self) -> ActiveBackend {
        let local = Arc::new(InMemoryBackend::new());
        if let Some(interval) = self.sweep_interval {
            *self.sweeper_slot() = Some(local.spawn_sweeper(interval));
        }
        ActiveBackend::InProcess(local)
    }

    fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper_slot().take() {
            handle.abort();
        }
    }

    fn sweeper_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sweeper.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("sweeper lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

impl Drop for BackendResolver {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
