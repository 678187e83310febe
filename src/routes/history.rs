use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{AddHistoryRequest, HistoryAppend},
    state::AppState,
};

/// Watch history with catalog details; unavailable movies come back as placeholders
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<Value>> {
    let ids = state.store.history(&claims.email).await?.unwrap_or_default();
    if ids.is_empty() {
        return Ok(Json(json!({
            "message": "No history found for this user",
            "movies": []
        })));
    }

    let movies = state.enricher().enrich(&ids).await;
    Ok(Json(json!({ "user": claims.email, "movies": movies })))
}

/// Append a movie to the caller's history, ignoring duplicates
pub async fn add(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(request): Json<AddHistoryRequest>,
) -> AppResult<Json<Value>> {
    let outcome = state
        .store
        .append_history(&claims.email, request.tmdb_movie_id)
        .await?;

    tracing::debug!(movie_id = request.tmdb_movie_id, ?outcome, "History updated");

    let message = match outcome {
        HistoryAppend::AlreadyPresent => "Movie already exists in history.",
        HistoryAppend::Created | HistoryAppend::Appended => "Movie added to history.",
    };
    Ok(Json(json!({ "message": message })))
}
