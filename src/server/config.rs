//! Service configuration from `SPLITLAB_*` environment variables

use crate::engine::{ComputationBackend, LocalBackend, RemoteBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default port for the engine API and health endpoints
pub const DEFAULT_PORT: u16 = 8080;

/// Default timeout for calls to a remote engine
pub const DEFAULT_REMOTE_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub backend: BackendKind,
    pub remote_url: Option<String>,
    pub remote_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend: BackendKind::Local,
            remote_url: None,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECONDS),
        }
    }
}

impl ServiceConfig {
    /// Read the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("SPLITLAB_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Invalid SPLITLAB_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        let backend = match lookup("SPLITLAB_BACKEND").as_deref() {
            None | Some("local") => BackendKind::Local,
            Some("remote") => BackendKind::Remote,
            Some(other) => {
                warn!(value = %other, "Unknown SPLITLAB_BACKEND, using local");
                BackendKind::Local
            }
        };

        let remote_url = lookup("SPLITLAB_REMOTE_URL").filter(|url| !url.is_empty());

        let remote_timeout = lookup("SPLITLAB_REMOTE_TIMEOUT_SECONDS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.remote_timeout);

        Self {
            port,
            backend,
            remote_url,
            remote_timeout,
        }
    }

    /// Build the configured backend
    ///
    /// Remote without a URL is a misconfiguration and falls back to local.
    pub fn build_backend(&self) -> Arc<dyn ComputationBackend> {
        match (self.backend, &self.remote_url) {
            (BackendKind::Local, _) => Arc::new(LocalBackend),
            (BackendKind::Remote, Some(url)) => {
                info!(url = %url, timeout = ?self.remote_timeout, "Using remote computation backend");
                Arc::new(RemoteBackend::new(url.clone(), self.remote_timeout))
            }
            (BackendKind::Remote, None) => {
                warn!("SPLITLAB_BACKEND=remote but SPLITLAB_REMOTE_URL is not set, falling back to local");
                Arc::new(LocalBackend)
            }
        }
    }
}
