use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::{ShowType, TrackedShow},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    show_type: Option<ShowType>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub tracked: bool,
    pub tracked_count: usize,
}

/// Tracked list in insertion order, optionally narrowed to one type
pub async fn list(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<Vec<TrackedShow>>> {
    let session = state.session(&user).await?;
    let store = &session.store;
    let shows = match params.show_type {
        Some(ShowType::Movie) => store.movies().await,
        Some(ShowType::Series) => store.series().await,
        None => store.snapshot().await,
    };
    Ok(Json(shows))
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(show): Json<TrackedShow>,
) -> AppResult<Json<ToggleResponse>> {
    if show.id.trim().is_empty() {
        return Err(AppError::InvalidInput("Show id must not be empty".to_string()));
    }

    let session = state.session(&user).await?;
    let id = show.id.clone();
    session.store.toggle(show).await;

    Ok(Json(ToggleResponse {
        tracked: session.store.is_tracked(&id).await,
        tracked_count: session.store.len().await,
    }))
}

/// Replaces the cached record of a tracked show
///
/// AI status and episode summaries omitted from the body are kept.
pub async fn update(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
    Json(show): Json<TrackedShow>,
) -> AppResult<Json<TrackedShow>> {
    if show.id != id {
        return Err(AppError::InvalidInput(format!(
            "Body id {} does not match path id {}",
            show.id, id
        )));
    }

    let session = state.session(&user).await?;
    let store = &session.store;
    let updated = store
        .apply_client_update(show)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Show {} is not tracked", id)))?;

    Ok(Json(updated))
}

/// Untracks everything and abandons any running update cycle
pub async fn clear(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> AppResult<StatusCode> {
    let session = state.session(&user).await?;
    session.refresher.cancel();
    session.store.clear().await;
    Ok(StatusCode::NO_CONTENT)
}
