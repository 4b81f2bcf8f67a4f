use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    models::DerivedUpdateEntry,
    services::{tracking::TrackingStore, updates::UpdateEngine},
};

/// What the feeds screen should show
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    /// Nothing tracked yet: prompt to add shows
    NoTrackedShows,
    /// Shows are tracked but no feed entry was computed: offer a retry
    NoUpdates,
    Ready,
}

impl FeedState {
    /// Discriminates on the canonical tracked list size, not on feed contents alone
    pub fn classify(tracked_count: usize, entries: usize) -> Self {
        match (tracked_count, entries) {
            (0, _) => FeedState::NoTrackedShows,
            (_, 0) => FeedState::NoUpdates,
            _ => FeedState::Ready,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateFeeds {
    pub state: FeedState,
    pub tracked_count: usize,
    pub upcoming: Vec<DerivedUpdateEntry>,
    pub recently_released: Vec<DerivedUpdateEntry>,
}

/// Runs update cycles for one store, one at a time
///
/// Starting a cycle cancels the one in flight, so only the latest cycle can
/// write summaries back into the store.
pub struct UpdateRefresher {
    engine: UpdateEngine,
    next_cycle: AtomicU64,
    in_flight: Mutex<Option<Cycle>>,
}

struct Cycle {
    id: u64,
    token: CancellationToken,
}

impl UpdateRefresher {
    pub fn new(engine: UpdateEngine) -> Self {
        Self {
            engine,
            next_cycle: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &UpdateEngine {
        &self.engine
    }

    /// Computes both feeds from a snapshot of `store` and caches the summaries
    ///
    /// Returns [`AppError::Cancelled`] if a newer cycle superseded this one or
    /// [`UpdateRefresher::cancel`] was called; nothing is written back then.
    pub async fn refresh(
        &self,
        store: &TrackingStore,
        window_days: u32,
        today: NaiveDate,
    ) -> AppResult<UpdateFeeds> {
        let (cycle_id, token) = self.begin_cycle();
        let snapshot = store.snapshot().await;

        let result = self
            .engine
            .compute_feeds(&snapshot, window_days, today, &token)
            .await;

        let feeds = match result {
            Ok(feeds) if !token.is_cancelled() => feeds,
            Ok(_) | Err(AppError::Cancelled) => {
                tracing::info!(user_id = %store.user_id(), cycle_id, "Update cycle cancelled");
                self.end_cycle(cycle_id);
                return Err(AppError::Cancelled);
            }
            Err(e) => {
                self.end_cycle(cycle_id);
                return Err(e);
            }
        };

        let written = store
            .record_update_summaries(&feeds.upcoming, &feeds.recently_released, &token)
            .await;
        self.end_cycle(cycle_id);

        if !written {
            tracing::info!(user_id = %store.user_id(), cycle_id, "Update cycle cancelled before write-back");
            return Err(AppError::Cancelled);
        }

        let tracked_count = snapshot.len();
        let entries = feeds.upcoming.len() + feeds.recently_released.len();

        tracing::info!(
            user_id = %store.user_id(),
            cycle_id,
            tracked_count,
            upcoming = feeds.upcoming.len(),
            recently_released = feeds.recently_released.len(),
            "Update cycle completed"
        );

        Ok(UpdateFeeds {
            state: FeedState::classify(tracked_count, entries),
            tracked_count,
            upcoming: feeds.upcoming,
            recently_released: feeds.recently_released,
        })
    }

    /// Cancels the in-flight cycle, if any
    pub fn cancel(&self) {
        if let Some(cycle) = self.lock().take() {
            cycle.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    fn begin_cycle(&self) -> (u64, CancellationToken) {
        let id = self.next_cycle.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.lock().replace(Cycle {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            tracing::debug!(previous = previous.id, next = id, "Cancelling previous update cycle");
            previous.token.cancel();
        }
        (id, token)
    }

    /// Clears the slot unless a newer cycle already owns it
    fn end_cycle(&self, id: u64) {
        let mut in_flight = self.lock();
        if in_flight.as_ref().is_some_and(|cycle| cycle.id == id) {
            *in_flight = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Cycle>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryLibrary;
    use crate::models::{EpisodeRef, SearchKind, SeriesSnapshot, ShowType, TrackedShow};
    use crate::services::catalog::{CatalogClient, MockCatalogClient};
    use std::sync::Arc;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn series(id: &str, title: &str) -> TrackedShow {
        TrackedShow::new(id, title, "2020", ShowType::Series)
    }

    fn snapshot(last: &str, next: Option<&str>) -> SeriesSnapshot {
        SeriesSnapshot {
            status: Some("Returning Series".to_string()),
            next_episode_to_air: next.map(|d| EpisodeRef {
                season_number: Some(2),
                episode_number: Some(1),
                air_date: Some(d.to_string()),
            }),
            last_episode_to_air: Some(EpisodeRef {
                season_number: Some(1),
                episode_number: Some(8),
                air_date: Some(last.to_string()),
            }),
        }
    }

    async fn store_with(shows: Vec<TrackedShow>) -> TrackingStore {
        let store = TrackingStore::new("alice", Arc::new(InMemoryLibrary::new()));
        for show in shows {
            store.toggle(show).await;
        }
        store
    }

    /// Catalog whose queries never complete until the test is over
    struct StalledCatalog;

    #[async_trait::async_trait]
    impl CatalogClient for StalledCatalog {
        async fn fetch_series_snapshot(&self, _show_id: &str) -> AppResult<SeriesSnapshot> {
            std::future::pending().await
        }

        async fn search(&self, _query: &str, _kind: SearchKind) -> AppResult<Vec<TrackedShow>> {
            Ok(vec![])
        }

        async fn fetch_details(
            &self,
            show_id: &str,
            _show_type: ShowType,
        ) -> AppResult<TrackedShow> {
            Err(AppError::NotFound(show_id.to_string()))
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[test]
    fn test_feed_state_classify() {
        assert_eq!(FeedState::classify(0, 0), FeedState::NoTrackedShows);
        assert_eq!(FeedState::classify(3, 0), FeedState::NoUpdates);
        assert_eq!(FeedState::classify(3, 1), FeedState::Ready);
    }

    #[tokio::test]
    async fn test_refresh_caches_summaries() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_series_snapshot()
            .times(1)
            .returning(|_| Ok(snapshot("2024-06-08", Some("2024-06-17"))));
        catalog.expect_name().return_const("mock");
        let refresher = UpdateRefresher::new(UpdateEngine::new(Arc::new(catalog)));
        let store = store_with(vec![series("1", "One")]).await;

        let feeds = refresher.refresh(&store, 7, today()).await.unwrap();

        assert_eq!(feeds.state, FeedState::Ready);
        assert_eq!(feeds.tracked_count, 1);
        assert_eq!(feeds.upcoming[0].summary, "Next Episode: S2E1 on 2024-06-17");
        assert_eq!(
            feeds.recently_released[0].summary,
            "Last Episode: S1E8 on 2024-06-08"
        );

        let cached = store.get("1").await.unwrap();
        assert_eq!(
            cached.next_episode_summary.as_deref(),
            Some("Next Episode: S2E1 on 2024-06-17")
        );
        assert!(!refresher.is_running());
    }

    #[tokio::test]
    async fn test_refresh_outage_reports_no_updates() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_fetch_series_snapshot()
            .returning(|_| Err(AppError::ExternalApi("offline".to_string())));
        catalog.expect_name().return_const("mock");
        let refresher = UpdateRefresher::new(UpdateEngine::new(Arc::new(catalog)));
        let store = store_with(vec![series("1", "One")]).await;

        let feeds = refresher.refresh(&store, 7, today()).await.unwrap();
        assert_eq!(feeds.state, FeedState::NoUpdates);
        assert_eq!(feeds.tracked_count, 1);
    }

    #[tokio::test]
    async fn test_refresh_empty_library() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_fetch_series_snapshot().times(0);
        let refresher = UpdateRefresher::new(UpdateEngine::new(Arc::new(catalog)));
        let store = store_with(vec![]).await;

        let feeds = refresher.refresh(&store, 7, today()).await.unwrap();
        assert_eq!(feeds.state, FeedState::NoTrackedShows);
    }

    #[tokio::test]
    async fn test_cancel_leaves_store_untouched() {
        let refresher = Arc::new(UpdateRefresher::new(UpdateEngine::new(Arc::new(
            StalledCatalog,
        ))));
        let mut show = series("1", "One");
        show.next_episode_summary = Some("Next Episode: S1E1 on 2024-01-01".to_string());
        let store = store_with(vec![show.clone()]).await;
        let before = store.snapshot().await;

        let task = {
            let refresher = refresher.clone();
            let store = store.clone();
            tokio::spawn(async move { refresher.refresh(&store, 7, today()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(refresher.is_running());
        refresher.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(store.snapshot().await, before);
        assert!(!refresher.is_running());
    }

    #[tokio::test]
    async fn test_new_refresh_supersedes_in_flight_cycle() {
        let refresher = Arc::new(UpdateRefresher::new(UpdateEngine::new(Arc::new(
            StalledCatalog,
        ))));
        let store = store_with(vec![series("1", "One")]).await;

        let first = {
            let refresher = refresher.clone();
            let store = store.clone();
            tokio::spawn(async move { refresher.refresh(&store, 7, today()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let refresher = refresher.clone();
            let store = store.clone();
            tokio::spawn(async move { refresher.refresh(&store, 7, today()).await })
        };

        let first = first.await.unwrap();
        assert!(matches!(first, Err(AppError::Cancelled)));
        assert!(refresher.is_running());

        refresher.cancel();
        assert!(matches!(second.await.unwrap(), Err(AppError::Cancelled)));
    }
}
