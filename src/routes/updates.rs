use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::{
    api::AppState,
    config::MAX_RECENT_WINDOW_DAYS,
    error::{AppError, AppResult},
    models::DerivedUpdateEntry,
    services::UpdateFeeds,
};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    window_days: Option<u32>,
    /// Reference date as `YYYY-MM-DD`
    today: Option<String>,
}

impl FeedQuery {
    /// Absent falls back to the configured window. Zero is passed through and
    /// means the engine default.
    fn window_days(&self, configured: u32) -> AppResult<u32> {
        match self.window_days {
            None => Ok(configured),
            Some(days) if days > MAX_RECENT_WINDOW_DAYS => Err(AppError::InvalidInput(format!(
                "window_days must be at most {}, got {}",
                MAX_RECENT_WINDOW_DAYS, days
            ))),
            Some(days) => Ok(days),
        }
    }

    fn today(&self) -> AppResult<NaiveDate> {
        resolve_today(self.today.as_deref())
    }
}

/// Parses a `YYYY-MM-DD` date, defaulting to the current UTC date
pub(crate) fn resolve_today(raw: Option<&str>) -> AppResult<NaiveDate> {
    match raw {
        None => Ok(Utc::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::InvalidInput(format!("today must be YYYY-MM-DD, got {}", raw))
        }),
    }
}

async fn refresh(state: &AppState, user: &str, params: &FeedQuery) -> AppResult<UpdateFeeds> {
    let window_days = params.window_days(state.recent_window_days)?;
    let today = params.today()?;

    let session = state.session(user).await?;
    session
        .refresher
        .refresh(&session.store, window_days, today)
        .await
}

/// Both feeds and the screen state
pub async fn feeds(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<UpdateFeeds>> {
    Ok(Json(refresh(&state, &user, &params).await?))
}

pub async fn upcoming(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<DerivedUpdateEntry>>> {
    Ok(Json(refresh(&state, &user, &params).await?.upcoming))
}

pub async fn recent(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<Vec<DerivedUpdateEntry>>> {
    Ok(Json(refresh(&state, &user, &params).await?.recently_released))
}
