use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::{SearchKind, ShowType, TrackedShow},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default)]
    kind: SearchKind,
}

/// Handler for title search endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<TrackedShow>>> {
    if params.q.trim().is_empty() {
        return Err(AppError::InvalidInput("Search query must not be empty".to_string()));
    }

    let titles = state.catalog.search(&params.q, params.kind).await?;
    Ok(Json(titles))
}

/// Title details, served from the tracked record when it already has them
///
/// Freshly fetched details are merged onto the tracked record as it stands
/// once the catalog answers, and written back so later views skip the catalog.
pub async fn details(
    State(state): State<AppState>,
    Path((user, show_type, id)): Path<(String, ShowType, String)>,
) -> AppResult<Json<TrackedShow>> {
    let session = state.session(&user).await?;

    if let Some(show) = session.store.get(&id).await.filter(|s| s.has_details()) {
        tracing::debug!(user_id = %user, show_id = %id, "Serving cached details");
        return Ok(Json(show));
    }

    let fetched = state.catalog.fetch_details(&id, show_type).await?;

    match session.store.merge_details(&id, fetched.clone()).await {
        Some(merged) => Ok(Json(merged)),
        None => Ok(Json(fetched)),
    }
}
