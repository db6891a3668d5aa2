//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{ObjectStorage, RuleService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Create application state from its parts.
    #[must_use]
    pub fn new(pool: PgPool, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { pool, storage }),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }

    /// Rule service bound to this state's pool and storage.
    #[must_use]
    pub fn rules(&self) -> RuleService<'_> {
        RuleService::new(self.pool(), self.storage())
    }
}
