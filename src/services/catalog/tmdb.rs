/// TMDB catalog client
///
/// API Flow:
/// 1. Search: /search/{movie,tv,multi} → ids, titles, artwork paths
/// 2. Details: /{movie,tv}/{id}?append_to_response=credits,videos,watch/providers
/// 3. Episode metadata: /tv/{id} → status, next/last episode to air
///
/// Search and detail responses go through the optional Redis cache. Episode
/// metadata is always fetched fresh.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        tmdb::{
            TmdbErrorResponse, TmdbMovieDetail, TmdbSearchResponse, TmdbSearchResult,
            TmdbTvDetail,
        },
        SearchKind, SeriesSnapshot, ShowType, TrackedShow,
    },
    services::catalog::CatalogClient,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const DETAILS_APPEND: &str = "credits,videos,watch/providers";
const ERROR_BODY_SNIPPET: usize = 300;

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    cache: Option<Cache>,
}

impl TmdbClient {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        image_url: String,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            image_url,
            cache,
        }
    }

    /// GET a TMDB endpoint and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(endpoint = %endpoint, status = %status, "TMDB request failed");
            return Err(Self::api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                endpoint = %endpoint,
                error = %e,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    fn api_error(status: reqwest::StatusCode, body: &str) -> AppError {
        if let Ok(error) = serde_json::from_str::<TmdbErrorResponse>(body) {
            return AppError::ExternalApi(error.status_message);
        }
        let snippet: String = body.chars().take(ERROR_BODY_SNIPPET).collect();
        AppError::ExternalApi(format!("TMDB returned status {}: {}", status, snippet))
    }

    fn poster_url(&self, path: Option<&str>) -> Option<String> {
        path.map(|p| format!("{}/w500{}", self.image_url, p))
    }

    fn backdrop_url(&self, path: Option<&str>) -> Option<String> {
        path.map(|p| format!("{}/original{}", self.image_url, p))
    }

    /// Maps a search hit to a show, dropping people and other non-title hits
    fn search_result_to_show(
        &self,
        result: TmdbSearchResult,
        requested: SearchKind,
    ) -> Option<TrackedShow> {
        let show_type = match result.media_type.as_deref() {
            Some("movie") => ShowType::Movie,
            Some("tv") => ShowType::Series,
            Some(_) => return None,
            None => match requested {
                SearchKind::Movie => ShowType::Movie,
                SearchKind::Series => ShowType::Series,
                SearchKind::Multi if result.title.is_some() => ShowType::Movie,
                SearchKind::Multi => ShowType::Series,
            },
        };

        let title = result
            .title
            .clone()
            .or_else(|| result.name.clone())
            .unwrap_or_default();
        let date = result
            .release_date
            .as_deref()
            .or(result.first_air_date.as_deref())
            .unwrap_or_default();

        let mut show = TrackedShow::new(result.id.to_string(), title, extract_year(date), show_type);
        show.poster_url = self.poster_url(result.poster_path.as_deref());
        show.backdrop_url = self.backdrop_url(result.backdrop_path.as_deref());
        Some(show)
    }

    fn movie_detail_to_show(&self, detail: TmdbMovieDetail) -> TrackedShow {
        let credits = detail.credits.unwrap_or_default();
        let mut show = TrackedShow::new(
            detail.id.to_string(),
            detail.title,
            extract_year(detail.release_date.as_deref().unwrap_or_default()),
            ShowType::Movie,
        );
        show.poster_url = self.poster_url(detail.poster_path.as_deref());
        show.backdrop_url = self.backdrop_url(detail.backdrop_path.as_deref());
        show.plot = detail.overview;
        show.actors = join_names(credits.cast.iter().take(5).map(|c| c.name.as_str()));
        show.director = credits
            .crew
            .iter()
            .find(|c| c.job == "Director")
            .map(|c| c.name.clone());
        show.runtime = detail.runtime.map(|m| format!("{} min", m));
        show.genre = join_names(detail.genres.iter().map(|g| g.name.as_str()));
        show.rating = detail.vote_average.map(|r| format!("{:.1}", r));
        show.trailer_key = detail.videos.and_then(|v| v.trailer_key());
        show.watch_providers = detail.watch_providers.map(|p| p.us_flatrate());
        show
    }

    fn tv_detail_to_show(&self, detail: TmdbTvDetail) -> TrackedShow {
        let credits = detail.credits.unwrap_or_default();
        let mut show = TrackedShow::new(
            detail.id.to_string(),
            detail.name,
            extract_year(detail.first_air_date.as_deref().unwrap_or_default()),
            ShowType::Series,
        );
        show.poster_url = self.poster_url(detail.poster_path.as_deref());
        show.backdrop_url = self.backdrop_url(detail.backdrop_path.as_deref());
        show.plot = detail.overview;
        show.actors = join_names(credits.cast.iter().take(5).map(|c| c.name.as_str()));
        show.director = detail.created_by.first().map(|c| c.name.clone());
        show.runtime = detail.episode_run_time.first().map(|m| format!("{} min", m));
        show.genre = join_names(detail.genres.iter().map(|g| g.name.as_str()));
        show.rating = detail.vote_average.map(|r| format!("{:.1}", r));
        show.trailer_key = detail.videos.and_then(|v| v.trailer_key());
        show.watch_providers = detail.watch_providers.map(|p| p.us_flatrate());
        show
    }

    async fn search_uncached(&self, query: &str, kind: SearchKind) -> AppResult<Vec<TrackedShow>> {
        let endpoint = match kind {
            SearchKind::Movie => "/search/movie",
            SearchKind::Series => "/search/tv",
            SearchKind::Multi => "/search/multi",
        };

        let response: TmdbSearchResponse = self
            .get_json(endpoint, &[("query", query), ("include_adult", "false")])
            .await?;

        let shows: Vec<TrackedShow> = response
            .results
            .into_iter()
            .filter_map(|r| self.search_result_to_show(r, kind))
            .collect();

        tracing::info!(
            query = %query,
            kind = %kind,
            results = shows.len(),
            catalog = "tmdb",
            "Title search completed"
        );

        Ok(shows)
    }

    async fn fetch_details_uncached(
        &self,
        show_id: &str,
        show_type: ShowType,
    ) -> AppResult<TrackedShow> {
        let params = [("append_to_response", DETAILS_APPEND)];
        let show = match show_type {
            ShowType::Movie => {
                let detail: TmdbMovieDetail =
                    self.get_json(&format!("/movie/{}", show_id), &params).await?;
                self.movie_detail_to_show(detail)
            }
            ShowType::Series => {
                let detail: TmdbTvDetail =
                    self.get_json(&format!("/tv/{}", show_id), &params).await?;
                self.tv_detail_to_show(detail)
            }
        };

        tracing::info!(show_id = %show_id, show_type = %show_type, catalog = "tmdb", "Details fetched");

        Ok(show)
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn fetch_series_snapshot(&self, show_id: &str) -> AppResult<SeriesSnapshot> {
        let detail: TmdbTvDetail = self.get_json(&format!("/tv/{}", show_id), &[]).await?;
        let snapshot = SeriesSnapshot::from(detail);

        tracing::debug!(
            show_id = %show_id,
            status = ?snapshot.status,
            has_next = snapshot.next_episode_to_air.is_some(),
            has_last = snapshot.last_episode_to_air.is_some(),
            "Series snapshot fetched"
        );

        Ok(snapshot)
    }

    async fn search(&self, query: &str, kind: SearchKind) -> AppResult<Vec<TrackedShow>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Search(kind, query.to_string()),
                SEARCH_CACHE_TTL,
                self.search_uncached(query, kind)
            ),
            None => self.search_uncached(query, kind).await,
        }
    }

    async fn fetch_details(&self, show_id: &str, show_type: ShowType) -> AppResult<TrackedShow> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Details(show_type, show_id.to_string()),
                DETAILS_CACHE_TTL,
                self.fetch_details_uncached(show_id, show_type)
            ),
            None => self.fetch_details_uncached(show_id, show_type).await,
        }
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

/// First four characters of a TMDB date, or "N/A"
fn extract_year(date: &str) -> String {
    if date.is_empty() {
        return "N/A".to_string();
    }
    date.chars().take(4).collect()
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
