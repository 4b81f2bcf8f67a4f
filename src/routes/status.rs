use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::AppResult,
    models::{ShowType, StatusResponse, TrackedShow},
    routes::updates::resolve_today,
    services::status::status_request,
};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Bypass the status cached on the tracked record
    #[serde(default)]
    refresh: bool,
    today: Option<String>,
}

/// AI status for a title
///
/// Tracked shows keep their last status; it is returned as-is unless
/// `refresh` is set. Untracked titles are looked up in the catalog for their
/// name and are never cached.
pub async fn fetch_status(
    State(state): State<AppState>,
    Path((user, show_type, id)): Path<(String, ShowType, String)>,
    Query(params): Query<StatusQuery>,
) -> AppResult<Json<StatusResponse>> {
    let today = resolve_today(params.today.as_deref())?;
    let session = state.session(&user).await?;
    let tracked = session.store.get(&id).await;

    if let Some(cached) = tracked
        .as_ref()
        .filter(|_| !params.refresh)
        .and_then(cached_status)
    {
        tracing::debug!(user_id = %user, show_id = %id, "Serving cached status");
        return Ok(Json(cached));
    }

    let show = match tracked {
        Some(show) => show,
        None => state.catalog.fetch_details(&id, show_type).await?,
    };

    let status = state.status.fetch_status(status_request(&show, today)).await?;
    session.store.apply_status(&id, &status).await;

    Ok(Json(status))
}

fn cached_status(show: &TrackedShow) -> Option<StatusResponse> {
    Some(StatusResponse {
        status: show.ai_status.clone()?,
        summary: show.ai_summary.clone()?,
        sources: show.ai_sources.clone(),
        cached: Some(true),
    })
}
