//! Update computation engine
//!
//! Given a snapshot of the tracked list, fans out one catalog query per
//! series, classifies each show into the "upcoming" and "recently released"
//! feeds, and sorts the feeds deterministically. A failed query only removes
//! that show from the cycle's output; it never fails the batch.

use std::{cmp::Ordering, sync::Arc};

use chrono::NaiveDate;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    models::{DerivedUpdateEntry, EpisodeRef, SeriesSnapshot, TrackedShow},
    services::catalog::CatalogClient,
};

/// Window used when the caller passes 0
pub const DEFAULT_RECENT_WINDOW_DAYS: u32 = 7;

const NEXT_EPISODE_LABEL: &str = "Next Episode";
const LAST_EPISODE_LABEL: &str = "Last Episode";
const AIR_DATE_SEPARATOR: &str = " on ";
const AIR_DATE_FORMAT: &str = "%Y-%m-%d";
const UNKNOWN_AIR_DATE: &str = "TBD";

/// Both feeds derived from one fan-out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFeeds {
    pub upcoming: Vec<DerivedUpdateEntry>,
    pub recently_released: Vec<DerivedUpdateEntry>,
}

#[derive(Clone)]
pub struct UpdateEngine {
    catalog: Arc<dyn CatalogClient>,
}

impl UpdateEngine {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    /// Series with a scheduled next episode, soonest first
    pub async fn compute_upcoming(
        &self,
        tracked: &[TrackedShow],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<DerivedUpdateEntry>> {
        let snapshots = self.fetch_snapshots(tracked, cancel).await?;
        Ok(classify_upcoming(&snapshots))
    }

    /// Series whose latest aired episode falls within `window_days` of `today`,
    /// most recent first
    pub async fn compute_recently_released(
        &self,
        tracked: &[TrackedShow],
        window_days: u32,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<DerivedUpdateEntry>> {
        let snapshots = self.fetch_snapshots(tracked, cancel).await?;
        Ok(classify_recently_released(&snapshots, window_days, today))
    }

    /// Both feeds from a single query per series
    pub async fn compute_feeds(
        &self,
        tracked: &[TrackedShow],
        window_days: u32,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> AppResult<DerivedFeeds> {
        let snapshots = self.fetch_snapshots(tracked, cancel).await?;
        Ok(DerivedFeeds {
            upcoming: classify_upcoming(&snapshots),
            recently_released: classify_recently_released(&snapshots, window_days, today),
        })
    }

    /// Queries every tracked series concurrently
    ///
    /// Returns the shows whose query succeeded, in completion order. Failed
    /// queries are logged and skipped. Cancellation aborts every outstanding
    /// query and discards the partial results.
    async fn fetch_snapshots(
        &self,
        tracked: &[TrackedShow],
        cancel: &CancellationToken,
    ) -> AppResult<Vec<(TrackedShow, SeriesSnapshot)>> {
        let series: Vec<TrackedShow> = tracked.iter().filter(|s| s.is_series()).cloned().collect();

        if series.is_empty() {
            return Ok(Vec::new());
        }

        let requested = series.len();
        let mut tasks = JoinSet::new();

        for show in series {
            let catalog = Arc::clone(&self.catalog);
            tasks.spawn(async move {
                let result = catalog.fetch_series_snapshot(&show.id).await;
                (show, result)
            });
        }

        let mut snapshots = Vec::with_capacity(requested);
        let mut error_count = 0usize;

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    tracing::info!(
                        requested,
                        completed = snapshots.len() + error_count,
                        "Update computation cancelled"
                    );
                    return Err(AppError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((show, Ok(snapshot))) => snapshots.push((show, snapshot)),
                Ok((show, Err(e))) => {
                    tracing::warn!(
                        show_id = %show.id,
                        title = %show.title,
                        error = %e,
                        "Series snapshot fetch failed"
                    );
                    error_count += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Snapshot task join error");
                    error_count += 1;
                }
            }
        }

        if error_count > 0 {
            tracing::warn!(
                success_count = snapshots.len(),
                error_count,
                "Partial series snapshot failure"
            );
        }

        tracing::info!(
            requested,
            fetched = snapshots.len(),
            catalog = self.catalog.name(),
            "Series snapshots fetched"
        );

        Ok(snapshots)
    }
}

/// Shows with a non-null next episode, regardless of series status
pub fn classify_upcoming(snapshots: &[(TrackedShow, SeriesSnapshot)]) -> Vec<DerivedUpdateEntry> {
    let mut entries: Vec<DerivedUpdateEntry> = snapshots
        .iter()
        .filter_map(|(show, snapshot)| {
            let next = snapshot.next_episode_to_air.as_ref()?;
            Some(DerivedUpdateEntry {
                show: show.clone(),
                summary: format_summary(NEXT_EPISODE_LABEL, next),
            })
        })
        .collect();

    entries.sort_by(upcoming_order);
    entries
}

/// Shows whose last aired episode (or, failing that, next scheduled episode)
/// aired between 0 and `window_days` calendar days before `today`
pub fn classify_recently_released(
    snapshots: &[(TrackedShow, SeriesSnapshot)],
    window_days: u32,
    today: NaiveDate,
) -> Vec<DerivedUpdateEntry> {
    let window = i64::from(effective_window(window_days));

    let mut entries: Vec<DerivedUpdateEntry> = snapshots
        .iter()
        .filter_map(|(show, snapshot)| {
            let episode = snapshot
                .last_episode_to_air
                .as_ref()
                .or(snapshot.next_episode_to_air.as_ref())?;
            let aired = parse_air_date(episode.air_date.as_deref()?)?;
            let days_ago = today.signed_duration_since(aired).num_days();
            if !(0..=window).contains(&days_ago) {
                return None;
            }
            Some(DerivedUpdateEntry {
                show: show.clone(),
                summary: format_summary(LAST_EPISODE_LABEL, episode),
            })
        })
        .collect();

    entries.sort_by(recent_order);
    entries
}

pub fn effective_window(window_days: u32) -> u32 {
    if window_days == 0 {
        DEFAULT_RECENT_WINDOW_DAYS
    } else {
        window_days
    }
}

/// `"{label}: S{season}E{episode} on {air date}"` with 0 / "TBD" defaults
pub fn format_summary(label: &str, episode: &EpisodeRef) -> String {
    format!(
        "{}: S{}E{}{}{}",
        label,
        episode.season_number.unwrap_or(0),
        episode.episode_number.unwrap_or(0),
        AIR_DATE_SEPARATOR,
        episode.air_date.as_deref().unwrap_or(UNKNOWN_AIR_DATE)
    )
}

/// Parses a catalog `YYYY-MM-DD` date; anything else is "no usable date"
pub fn parse_air_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), AIR_DATE_FORMAT).ok()
}

/// Reads the air date back out of a generated summary
pub fn summary_air_date(summary: &str) -> Option<NaiveDate> {
    let (_, raw) = summary.rsplit_once(AIR_DATE_SEPARATOR)?;
    parse_air_date(raw)
}

/// Dated before undated, earlier dates first, then title
fn upcoming_order(a: &DerivedUpdateEntry, b: &DerivedUpdateEntry) -> Ordering {
    let date_order = match (summary_air_date(&a.summary), summary_air_date(&b.summary)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    date_order.then_with(|| a.show.title.cmp(&b.show.title))
}

/// Dated before undated, later dates first, then title
fn recent_order(a: &DerivedUpdateEntry, b: &DerivedUpdateEntry) -> Ordering {
    let date_order = match (summary_air_date(&a.summary), summary_air_date(&b.summary)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    date_order.then_with(|| a.show.title.cmp(&b.show.title))
}
