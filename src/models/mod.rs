use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod status;
pub mod tmdb;

pub use status::{StatusRequest, StatusResponse};

/// Kind of tracked title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShowType {
    Movie,
    Series,
}

impl Display for ShowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShowType::Movie => write!(f, "movie"),
            ShowType::Series => write!(f, "series"),
        }
    }
}

/// Which catalog search endpoint to query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Movie,
    #[default]
    Series,
    Multi,
}

impl Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchKind::Movie => write!(f, "movie"),
            SearchKind::Series => write!(f, "series"),
            SearchKind::Multi => write!(f, "multi"),
        }
    }
}

/// Streaming provider offering a title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProvider {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

/// Citation returned alongside an AI status summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A movie or series the user follows, plus everything cached about it
///
/// Three groups of optional fields are filled by different writers and must
/// never clobber each other: catalog details, AI status, and update summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedShow {
    /// TMDB id as a string
    pub id: String,
    pub title: String,
    /// Release year label, `"N/A"` when unknown
    pub year: String,
    #[serde(rename = "type")]
    pub show_type: ShowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_url: Option<String>,

    // Catalog details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_providers: Option<Vec<WatchProvider>>,

    // AI status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_cached: Option<bool>,

    // Update engine summaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_episode_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_episode_summary: Option<String>,

    #[serde(default)]
    pub notifications_enabled: bool,
}

impl TrackedShow {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        year: impl Into<String>,
        show_type: ShowType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            year: year.into(),
            show_type,
            poster_url: None,
            backdrop_url: None,
            plot: None,
            actors: None,
            director: None,
            runtime: None,
            genre: None,
            rating: None,
            trailer_key: None,
            watch_providers: None,
            ai_status: None,
            ai_summary: None,
            ai_sources: None,
            ai_cached: None,
            next_episode_summary: None,
            last_episode_summary: None,
            notifications_enabled: false,
        }
    }

    pub fn is_series(&self) -> bool {
        self.show_type == ShowType::Series
    }

    pub fn has_details(&self) -> bool {
        self.plot.is_some()
            || self.actors.is_some()
            || self.director.is_some()
            || self.genre.is_some()
            || self.rating.is_some()
    }

    /// Takes catalog details from `fetched`, keeping this record's AI status,
    /// update summaries and preference flags.
    pub fn merge_details(&self, fetched: TrackedShow) -> TrackedShow {
        TrackedShow {
            ai_status: self.ai_status.clone(),
            ai_summary: self.ai_summary.clone(),
            ai_sources: self.ai_sources.clone(),
            ai_cached: self.ai_cached,
            next_episode_summary: self.next_episode_summary.clone(),
            last_episode_summary: self.last_episode_summary.clone(),
            notifications_enabled: self.notifications_enabled,
            poster_url: fetched.poster_url.or_else(|| self.poster_url.clone()),
            backdrop_url: fetched.backdrop_url.or_else(|| self.backdrop_url.clone()),
            ..fetched
        }
    }

    /// Fills the AI status and episode summaries this record omits from
    /// `existing`. Fields this record carries win.
    pub fn keep_derived_from(self, existing: &TrackedShow) -> TrackedShow {
        TrackedShow {
            ai_status: self.ai_status.or_else(|| existing.ai_status.clone()),
            ai_summary: self.ai_summary.or_else(|| existing.ai_summary.clone()),
            ai_sources: self.ai_sources.or_else(|| existing.ai_sources.clone()),
            ai_cached: self.ai_cached.or(existing.ai_cached),
            next_episode_summary: self
                .next_episode_summary
                .or_else(|| existing.next_episode_summary.clone()),
            last_episode_summary: self
                .last_episode_summary
                .or_else(|| existing.last_episode_summary.clone()),
            ..self
        }
    }

    /// Writes the AI status fields only.
    pub fn apply_status(&mut self, status: &StatusResponse) {
        self.ai_status = Some(status.status.clone());
        self.ai_summary = Some(status.summary.clone());
        self.ai_sources = status.sources.clone();
        self.ai_cached = status.cached;
    }
}

/// Episode reference as reported by the catalog
///
/// The air date stays the raw catalog string; parsing happens where it is
/// consumed so that malformed dates degrade to "no usable date".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EpisodeRef {
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub air_date: Option<String>,
}

/// Per-show episode metadata fetched once per computation cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSnapshot {
    /// Free-text status, e.g. "Returning Series" or "Ended"
    pub status: Option<String>,
    pub next_episode_to_air: Option<EpisodeRef>,
    pub last_episode_to_air: Option<EpisodeRef>,
}

/// A tracked show annotated with a one-line episode summary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DerivedUpdateEntry {
    pub show: TrackedShow,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_type_serialization() {
        assert_eq!(serde_json::to_string(&ShowType::Movie).unwrap(), "\"movie\"");
        assert_eq!(serde_json::to_string(&ShowType::Series).unwrap(), "\"series\"");
    }

    #[test]
    fn test_tracked_show_deserializes_with_missing_optionals() {
        let json = r#"{"id": "1399", "title": "Game of Thrones", "year": "2011", "type": "series"}"#;
        let show: TrackedShow = serde_json::from_str(json).unwrap();
        assert_eq!(show.id, "1399");
        assert_eq!(show.show_type, ShowType::Series);
        assert!(!show.notifications_enabled);
        assert!(!show.has_details());
    }

    #[test]
    fn test_tracked_show_omits_empty_fields() {
        let show = TrackedShow::new("603", "The Matrix", "1999", ShowType::Movie);
        let value = serde_json::to_value(&show).unwrap();
        assert_eq!(value["type"], "movie");
        assert!(value.get("plot").is_none());
        assert!(value.get("ai_summary").is_none());
    }

    #[test]
    fn test_merge_details_preserves_ai_and_update_fields() {
        let mut cached = TrackedShow::new("1399", "Game of Thrones", "2011", ShowType::Series);
        cached.ai_status = Some("Ended".to_string());
        cached.ai_summary = Some("The series concluded in 2019.".to_string());
        cached.next_episode_summary = Some("Next Episode: S0E0 on TBD".to_string());
        cached.notifications_enabled = true;
        cached.poster_url = Some("https://img/poster.jpg".to_string());

        let mut fetched = TrackedShow::new("1399", "Game of Thrones", "2011", ShowType::Series);
        fetched.plot = Some("Nine noble families...".to_string());
        fetched.rating = Some("8.5".to_string());

        let merged = cached.merge_details(fetched);
        assert_eq!(merged.plot.as_deref(), Some("Nine noble families..."));
        assert_eq!(merged.ai_status.as_deref(), Some("Ended"));
        assert_eq!(
            merged.next_episode_summary.as_deref(),
            Some("Next Episode: S0E0 on TBD")
        );
        assert!(merged.notifications_enabled);
        assert_eq!(merged.poster_url.as_deref(), Some("https://img/poster.jpg"));
        assert!(merged.has_details());
    }

    #[test]
    fn test_apply_status_leaves_update_summaries() {
        let mut show = TrackedShow::new("1399", "Game of Thrones", "2011", ShowType::Series);
        show.last_episode_summary = Some("Last Episode: S8E6 on 2019-05-19".to_string());

        show.apply_status(&StatusResponse {
            status: "Ended".to_string(),
            summary: "Finished after eight seasons.".to_string(),
            sources: None,
            cached: Some(true),
        });

        assert_eq!(show.ai_status.as_deref(), Some("Ended"));
        assert_eq!(show.ai_cached, Some(true));
        assert_eq!(
            show.last_episode_summary.as_deref(),
            Some("Last Episode: S8E6 on 2019-05-19")
        );
    }
}
