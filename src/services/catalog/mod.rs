//! Catalog abstraction
//!
//! The update engine only needs per-show episode metadata, but the search and
//! detail paths share the same client so one implementation (and one response
//! cache) serves all of them.

use crate::{
    error::AppResult,
    models::{SearchKind, SeriesSnapshot, ShowType, TrackedShow},
};

pub mod tmdb;

pub use tmdb::TmdbClient;

/// Media catalog queried for search results, details and episode metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch status and next/last episode references for a series
    ///
    /// Missing episode references are `None` fields, never an error.
    async fn fetch_series_snapshot(&self, show_id: &str) -> AppResult<SeriesSnapshot>;

    /// Search titles by name
    async fn search(&self, query: &str, kind: SearchKind) -> AppResult<Vec<TrackedShow>>;

    /// Fetch descriptive details (plot, cast, genres, trailer, providers)
    async fn fetch_details(&self, show_id: &str, show_type: ShowType) -> AppResult<TrackedShow>;

    /// Catalog name for logging
    fn name(&self) -> &'static str;
}
