// ============================================================================
// TMDB API Types
// ============================================================================

use serde::Deserialize;

use super::{EpisodeRef, SeriesSnapshot, WatchProvider};

/// Search response from /search/{movie,tv,multi}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    pub results: Vec<TmdbSearchResult>,
}

/// Single search hit. Movies carry `title`, series carry `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResult {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

/// Error payload TMDB returns on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbErrorResponse {
    pub status_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCast>,
    #[serde(default)]
    pub crew: Vec<TmdbCrew>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCast {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrew {
    pub name: String,
    pub job: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCreator {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub site: String,
    #[serde(default)]
    pub official: Option<bool>,
}

impl TmdbVideos {
    /// Official YouTube trailer if any, else the first YouTube trailer
    pub fn trailer_key(&self) -> Option<String> {
        let is_trailer = |v: &&TmdbVideo| v.site == "YouTube" && v.video_type == "Trailer";
        self.results
            .iter()
            .filter(is_trailer)
            .find(|v| v.official.unwrap_or(false))
            .or_else(|| self.results.iter().find(is_trailer))
            .map(|v| v.key.clone())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: Option<TmdbWatchProviderRegions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProviderRegions {
    #[serde(rename = "US", default)]
    pub us: Option<TmdbCountryProviders>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCountryProviders {
    #[serde(default)]
    pub flatrate: Vec<TmdbProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

impl TmdbWatchProviders {
    /// US subscription providers
    pub fn us_flatrate(&self) -> Vec<WatchProvider> {
        self.results
            .as_ref()
            .and_then(|r| r.us.as_ref())
            .map(|us| {
                us.flatrate
                    .iter()
                    .map(|p| WatchProvider {
                        id: p.provider_id,
                        name: p.provider_name.clone(),
                        logo_path: p.logo_path.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Response from /movie/{id} with credits, videos and providers appended
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetail {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
    #[serde(rename = "watch/providers", default)]
    pub watch_providers: Option<TmdbWatchProviders>,
}

/// Episode object nested in /tv/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbEpisode {
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub season_number: Option<u32>,
}

impl From<TmdbEpisode> for EpisodeRef {
    fn from(episode: TmdbEpisode) -> Self {
        EpisodeRef {
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            air_date: episode.air_date,
        }
    }
}

/// Response from /tv/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTvDetail {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub created_by: Vec<TmdbCreator>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub next_episode_to_air: Option<TmdbEpisode>,
    #[serde(default)]
    pub last_episode_to_air: Option<TmdbEpisode>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
    #[serde(rename = "watch/providers", default)]
    pub watch_providers: Option<TmdbWatchProviders>,
}

impl From<TmdbTvDetail> for SeriesSnapshot {
    fn from(detail: TmdbTvDetail) -> Self {
        SeriesSnapshot {
            status: detail.status,
            next_episode_to_air: detail.next_episode_to_air.map(EpisodeRef::from),
            last_episode_to_air: detail.last_episode_to_air.map(EpisodeRef::from),
        }
    }
}
