use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{
    db::PersistedLibrary,
    error::AppResult,
    services::{CatalogClient, StatusClient, TrackingStore, UpdateEngine, UpdateRefresher},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogClient>,
    pub status: Arc<dyn StatusClient>,
    pub library: Arc<dyn PersistedLibrary>,
    /// Window used when a request does not name one
    pub recent_window_days: u32,
    sessions: Arc<RwLock<HashMap<String, Arc<UserSession>>>>,
}

/// One user's tracked list and the refresher that computes their feeds
pub struct UserSession {
    pub store: TrackingStore,
    pub refresher: UpdateRefresher,
    last_used: Mutex<Instant>,
}

impl UserSession {
    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        status: Arc<dyn StatusClient>,
        library: Arc<dyn PersistedLibrary>,
        recent_window_days: u32,
    ) -> Self {
        Self {
            catalog,
            status,
            library,
            recent_window_days,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Session for `user_id`, loading the persisted library on first use
    ///
    /// A failed load is returned and nothing is kept, so the next request
    /// retries the load.
    pub async fn session(&self, user_id: &str) -> AppResult<Arc<UserSession>> {
        if let Some(session) = self.sessions.read().await.get(user_id) {
            session.touch();
            return Ok(session.clone());
        }

        // Loaded outside the lock; a concurrent first request keeps whichever
        // session was inserted first.
        let store = TrackingStore::load(user_id, self.library.clone()).await?;
        let session = Arc::new(UserSession {
            store,
            refresher: UpdateRefresher::new(UpdateEngine::new(self.catalog.clone())),
            last_used: Mutex::new(Instant::now()),
        });

        Ok(self
            .sessions
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert(session)
            .clone())
    }

    /// Number of users with a loaded session
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions unused for at least `max_idle` that have no update
    /// cycle running. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.refresher.is_running() || session.idle_for() < max_idle
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }
}
