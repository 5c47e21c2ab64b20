//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::AuthService;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: ServerConfig,
    store: Arc<S>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create application state around an already-open store.
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<S>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Auth service bound to this state's store and session TTL.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_, S> {
        AuthService::new(self.store(), self.config().session_ttl_delta())
    }
}
