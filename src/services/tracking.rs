use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    db::PersistedLibrary,
    error::AppResult,
    models::{DerivedUpdateEntry, ShowType, StatusResponse, TrackedShow},
};

/// Authoritative in-memory tracked list for one user
///
/// Every mutation is written through to the persisted library before the call
/// returns. Persistence failures are logged and swallowed: the in-memory list
/// stays the source of truth for the session.
#[derive(Clone)]
pub struct TrackingStore {
    user_id: String,
    shows: Arc<RwLock<Vec<TrackedShow>>>,
    library: Arc<dyn PersistedLibrary>,
    changes: watch::Sender<Vec<TrackedShow>>,
}

impl TrackingStore {
    /// Empty store that persists to `library`
    pub fn new(user_id: impl Into<String>, library: Arc<dyn PersistedLibrary>) -> Self {
        let (changes, _) = watch::channel(Vec::new());
        Self {
            user_id: user_id.into(),
            shows: Arc::new(RwLock::new(Vec::new())),
            library,
            changes,
        }
    }

    /// Store seeded from the persisted library
    ///
    /// A missing record and an empty list both start empty. A load failure is
    /// returned rather than treated as empty, since the first write-through
    /// would otherwise replace the stored list.
    pub async fn load(
        user_id: impl Into<String>,
        library: Arc<dyn PersistedLibrary>,
    ) -> AppResult<Self> {
        let store = Self::new(user_id, library);

        let shows = match store.library.load(&store.user_id).await {
            Ok(Some(shows)) => shows,
            Ok(None) => {
                tracing::debug!(user_id = %store.user_id, "No stored library");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(
                    user_id = %store.user_id,
                    backend = store.library.name(),
                    error = %e,
                    "Failed to load tracked library"
                );
                return Err(e);
            }
        };

        tracing::info!(user_id = %store.user_id, tracked = shows.len(), "Tracked library loaded");

        *store.shows.write().await = shows.clone();
        store.changes.send_replace(shows);
        Ok(store)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Removes the show if tracked, otherwise appends it
    pub async fn toggle(&self, show: TrackedShow) {
        let mut shows = self.shows.write().await;
        if let Some(index) = shows.iter().position(|s| s.id == show.id) {
            let removed = shows.remove(index);
            tracing::info!(user_id = %self.user_id, show_id = %removed.id, "Stopped tracking");
        } else {
            tracing::info!(user_id = %self.user_id, show_id = %show.id, "Started tracking");
            shows.push(show);
        }
        self.persist(&shows).await;
    }

    pub async fn is_tracked(&self, id: &str) -> bool {
        self.shows.read().await.iter().any(|s| s.id == id)
    }

    /// Cached record for a tracked show
    pub async fn get(&self, id: &str) -> Option<TrackedShow> {
        self.shows.read().await.iter().find(|s| s.id == id).cloned()
    }

    /// Replaces the entry with the same id; no-op when it is not tracked
    pub async fn update_cached_fields(&self, show: TrackedShow) {
        let mut shows = self.shows.write().await;
        let Some(existing) = shows.iter_mut().find(|s| s.id == show.id) else {
            tracing::debug!(show_id = %show.id, "Ignoring update for untracked show");
            return;
        };
        *existing = show;
        self.persist(&shows).await;
    }

    /// Replaces a tracked entry with a client-supplied record, keeping the
    /// AI status and episode summaries the record omits
    pub async fn apply_client_update(&self, show: TrackedShow) -> Option<TrackedShow> {
        let mut shows = self.shows.write().await;
        let existing = shows.iter_mut().find(|s| s.id == show.id)?;
        *existing = show.keep_derived_from(existing);
        let updated = existing.clone();
        self.persist(&shows).await;
        Some(updated)
    }

    /// Merges freshly fetched catalog details onto the current tracked entry
    pub async fn merge_details(&self, id: &str, fetched: TrackedShow) -> Option<TrackedShow> {
        let mut shows = self.shows.write().await;
        let existing = shows.iter_mut().find(|s| s.id == id)?;
        *existing = existing.merge_details(fetched);
        let updated = existing.clone();
        self.persist(&shows).await;
        Some(updated)
    }

    /// Merges an AI status onto a tracked entry. Returns the updated record.
    pub async fn apply_status(&self, id: &str, status: &StatusResponse) -> Option<TrackedShow> {
        let mut shows = self.shows.write().await;
        let existing = shows.iter_mut().find(|s| s.id == id)?;
        existing.apply_status(status);
        let updated = existing.clone();
        self.persist(&shows).await;
        Some(updated)
    }

    /// Caches freshly computed feed summaries onto entries that are still tracked
    ///
    /// Writes nothing and returns `false` if `cancel` fired before the write
    /// lock was acquired.
    pub async fn record_update_summaries(
        &self,
        upcoming: &[DerivedUpdateEntry],
        recently_released: &[DerivedUpdateEntry],
        cancel: &CancellationToken,
    ) -> bool {
        let mut shows = self.shows.write().await;
        if cancel.is_cancelled() {
            return false;
        }
        let mut changed = 0usize;

        for show in shows.iter_mut() {
            if let Some(entry) = upcoming.iter().find(|e| e.show.id == show.id) {
                if show.next_episode_summary.as_deref() != Some(entry.summary.as_str()) {
                    show.next_episode_summary = Some(entry.summary.clone());
                    changed += 1;
                }
            }
            if let Some(entry) = recently_released.iter().find(|e| e.show.id == show.id) {
                if show.last_episode_summary.as_deref() != Some(entry.summary.as_str()) {
                    show.last_episode_summary = Some(entry.summary.clone());
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            tracing::debug!(user_id = %self.user_id, changed, "Cached update summaries");
            self.persist(&shows).await;
        }
        true
    }

    pub async fn clear(&self) {
        let mut shows = self.shows.write().await;
        shows.clear();
        self.persist(&shows).await;
    }

    /// Copy of the canonical list for one computation cycle
    pub async fn snapshot(&self) -> Vec<TrackedShow> {
        self.shows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.shows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shows.read().await.is_empty()
    }

    pub async fn movies(&self) -> Vec<TrackedShow> {
        self.of_type(ShowType::Movie).await
    }

    pub async fn series(&self) -> Vec<TrackedShow> {
        self.of_type(ShowType::Series).await
    }

    async fn of_type(&self, show_type: ShowType) -> Vec<TrackedShow> {
        self.shows
            .read()
            .await
            .iter()
            .filter(|s| s.show_type == show_type)
            .cloned()
            .collect()
    }

    /// Receives the full list after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Vec<TrackedShow>> {
        self.changes.subscribe()
    }

    /// Writes through while the caller still holds the write lock, so saves
    /// land in mutation order
    async fn persist(&self, shows: &[TrackedShow]) {
        self.changes.send_replace(shows.to_vec());

        if let Err(e) = self.library.save(&self.user_id, shows).await {
            tracing::error!(
                user_id = %self.user_id,
                backend = self.library.name(),
                error = %e,
                "Failed to persist tracked library"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::library::MockPersistedLibrary;
    use crate::db::InMemoryLibrary;
    use crate::error::AppError;
    use crate::models::Source;

    fn series(id: &str, title: &str) -> TrackedShow {
        TrackedShow::new(id, title, "2020", ShowType::Series)
    }

    fn movie(id: &str, title: &str) -> TrackedShow {
        TrackedShow::new(id, title, "2020", ShowType::Movie)
    }

    fn entry(show: &TrackedShow, summary: &str) -> DerivedUpdateEntry {
        DerivedUpdateEntry {
            show: show.clone(),
            summary: summary.to_string(),
        }
    }

    fn memory_store() -> (TrackingStore, Arc<InMemoryLibrary>) {
        let library = Arc::new(InMemoryLibrary::new());
        (TrackingStore::new("alice", library.clone()), library)
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let (store, _) = memory_store();
        let show = series("1399", "Game of Thrones");

        store.toggle(show.clone()).await;
        assert!(store.is_tracked("1399").await);

        store.toggle(show).await;
        assert!(!store.is_tracked("1399").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_double_toggle_restores_membership() {
        let (store, _) = memory_store();
        store.toggle(series("1", "One")).await;
        store.toggle(series("2", "Two")).await;

        store.toggle(series("1", "One")).await;
        store.toggle(series("1", "One")).await;

        let mut ids: Vec<String> = store.snapshot().await.into_iter().map(|s| s.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_toggle_writes_through() {
        let (store, library) = memory_store();
        store.toggle(series("1", "One")).await;

        let saved = library.load("alice").await.unwrap().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, "1");
    }

    #[tokio::test]
    async fn test_movies_and_series_views() {
        let (store, _) = memory_store();
        store.toggle(series("1", "Show")).await;
        store.toggle(movie("2", "Film")).await;

        assert_eq!(store.movies().await.len(), 1);
        assert_eq!(store.series().await[0].title, "Show");

        store.toggle(movie("2", "Film")).await;
        assert!(store.movies().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_cached_fields_replaces_in_place() {
        let (store, _) = memory_store();
        store.toggle(series("1", "One")).await;

        let mut updated = series("1", "One");
        updated.plot = Some("A plot".to_string());
        store.update_cached_fields(updated).await;

        assert_eq!(store.get("1").await.unwrap().plot.as_deref(), Some("A plot"));
    }

    #[tokio::test]
    async fn test_update_cached_fields_untracked_is_noop() {
        let mut library = MockPersistedLibrary::new();
        library.expect_save().times(0);
        let store = TrackingStore::new("alice", Arc::new(library));

        store.update_cached_fields(series("1", "One")).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_mutation() {
        let mut library = MockPersistedLibrary::new();
        library
            .expect_save()
            .times(1)
            .returning(|_, _| Err(AppError::Internal("disk full".to_string())));
        library.expect_name().return_const("mock");
        let store = TrackingStore::new("alice", Arc::new(library));

        store.toggle(series("1", "One")).await;
        assert!(store.is_tracked("1").await);
    }

    #[tokio::test]
    async fn test_load_failure_is_returned_and_nothing_is_saved() {
        let mut library = MockPersistedLibrary::new();
        library
            .expect_load()
            .returning(|_| Err(AppError::Internal("unreachable".to_string())));
        library.expect_save().times(0);
        library.expect_name().return_const("mock");

        let result = TrackingStore::load("alice", Arc::new(library)).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_load_seeds_from_library() {
        let library = Arc::new(InMemoryLibrary::new());
        library.save("alice", &[series("1", "One")]).await.unwrap();

        let store = TrackingStore::load("alice", library).await.unwrap();
        assert!(store.is_tracked("1").await);
        assert_eq!(store.subscribe().borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_record_update_summaries_skips_untracked_and_keeps_ai_fields() {
        let (store, _) = memory_store();
        let mut tracked = series("1", "One");
        tracked.ai_summary = Some("Renewed for season 3.".to_string());
        store.toggle(tracked.clone()).await;

        let untracked = series("2", "Two");
        store
            .record_update_summaries(
                &[
                    entry(&tracked, "Next Episode: S3E1 on 2025-01-01"),
                    entry(&untracked, "Next Episode: S1E1 on TBD"),
                ],
                &[entry(&tracked, "Last Episode: S2E10 on 2024-06-05")],
                &CancellationToken::new(),
            )
            .await;

        let cached = store.get("1").await.unwrap();
        assert_eq!(
            cached.next_episode_summary.as_deref(),
            Some("Next Episode: S3E1 on 2025-01-01")
        );
        assert_eq!(
            cached.last_episode_summary.as_deref(),
            Some("Last Episode: S2E10 on 2024-06-05")
        );
        assert_eq!(cached.ai_summary.as_deref(), Some("Renewed for season 3."));
        assert!(!store.is_tracked("2").await);
    }

    #[tokio::test]
    async fn test_apply_status_merges_ai_fields() {
        let (store, _) = memory_store();
        let mut tracked = series("1", "One");
        tracked.next_episode_summary = Some("Next Episode: S1E2 on TBD".to_string());
        store.toggle(tracked).await;

        let status = StatusResponse {
            status: "Returning".to_string(),
            summary: "Filming wraps in May.".to_string(),
            sources: None,
            cached: Some(false),
        };

        let updated = store.apply_status("1", &status).await.unwrap();
        assert_eq!(updated.ai_status.as_deref(), Some("Returning"));
        assert_eq!(
            updated.next_episode_summary.as_deref(),
            Some("Next Episode: S1E2 on TBD")
        );
        assert!(store.apply_status("missing", &status).await.is_none());
    }

    #[tokio::test]
    async fn test_record_update_summaries_skips_cancelled_cycle() {
        let (store, library) = memory_store();
        let show = series("1", "One");
        store.toggle(show.clone()).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let written = store
            .record_update_summaries(
                &[entry(&show, "Next Episode: S1E2 on 2024-07-01")],
                &[],
                &cancel,
            )
            .await;

        assert!(!written);
        assert!(store.get("1").await.unwrap().next_episode_summary.is_none());
        let saved = library.load("alice").await.unwrap().unwrap();
        assert!(saved[0].next_episode_summary.is_none());
    }

    #[tokio::test]
    async fn test_client_update_keeps_derived_fields() {
        let (store, _) = memory_store();
        let mut tracked = series("1", "One");
        tracked.ai_status = Some("Renewed".to_string());
        tracked.ai_sources = Some(vec![Source {
            title: Some("Deadline".to_string()),
            url: Some("https://deadline.com".to_string()),
        }]);
        tracked.next_episode_summary = Some("Next Episode: S2E1 on 2024-06-17".to_string());
        store.toggle(tracked).await;

        let mut body = series("1", "One");
        body.notifications_enabled = true;
        body.last_episode_summary = Some("Last Episode: S1E8 on 2024-06-08".to_string());

        let updated = store.apply_client_update(body).await.unwrap();
        assert!(updated.notifications_enabled);
        assert_eq!(updated.ai_status.as_deref(), Some("Renewed"));
        assert_eq!(updated.ai_sources.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            updated.next_episode_summary.as_deref(),
            Some("Next Episode: S2E1 on 2024-06-17")
        );
        assert_eq!(
            updated.last_episode_summary.as_deref(),
            Some("Last Episode: S1E8 on 2024-06-08")
        );
        assert_eq!(store.get("1").await, Some(updated));

        assert!(store.apply_client_update(series("2", "Two")).await.is_none());
    }

    #[tokio::test]
    async fn test_merge_details_uses_current_entry() {
        let (store, _) = memory_store();
        let show = series("1", "One");
        store.toggle(show.clone()).await;

        // Summary written after the caller last read the entry
        store
            .record_update_summaries(
                &[entry(&show, "Next Episode: S2E1 on 2024-06-17")],
                &[],
                &CancellationToken::new(),
            )
            .await;

        let mut fetched = series("1", "One");
        fetched.plot = Some("A plot".to_string());
        let merged = store.merge_details("1", fetched.clone()).await.unwrap();

        assert_eq!(merged.plot.as_deref(), Some("A plot"));
        assert_eq!(
            merged.next_episode_summary.as_deref(),
            Some("Next Episode: S2E1 on 2024-06-17")
        );
        assert!(store.merge_details("2", fetched).await.is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let (store, _) = memory_store();
        let mut changes = store.subscribe();

        store.toggle(series("1", "One")).await;
        changes.changed().await.unwrap();
        assert_eq!(changes.borrow_and_update().len(), 1);

        store.clear().await;
        changes.changed().await.unwrap();
        assert!(changes.borrow_and_update().is_empty());
    }
}
