use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{EnrichedMovie, RankWindow},
    routes::MoviesResponse,
    services::cold_start::DEFAULT_SAMPLE_SIZE,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub name: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_window_end")]
    pub end: usize,
}

fn default_window_end() -> usize {
    RankWindow::TOP_6.end
}

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    pub count: Option<usize>,
}

async fn recommend(
    state: &AppState,
    name: &str,
    window: RankWindow,
) -> AppResult<Json<MoviesResponse<EnrichedMovie>>> {
    let movies = state.recommendations.recommend(name, window).await?;
    Ok(Json(movies.into()))
}

/// Six closest movies
pub async fn top_6(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NameQuery>,
) -> AppResult<Json<MoviesResponse<EnrichedMovie>>> {
    recommend(&state, &params.name, RankWindow::TOP_6).await
}

/// Movies ranked seven to twelve
pub async fn top_6_to_12(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NameQuery>,
) -> AppResult<Json<MoviesResponse<EnrichedMovie>>> {
    recommend(&state, &params.name, RankWindow::NEXT_6).await
}

/// Arbitrary `[start, end)` rank window
pub async fn window(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
) -> AppResult<Json<MoviesResponse<EnrichedMovie>>> {
    if params.start > params.end {
        return Err(AppError::InvalidInput(
            "start must not exceed end".to_string(),
        ));
    }
    recommend(&state, &params.name, RankWindow::new(params.start, params.end)).await
}

/// Random movies for visitors without history
pub async fn cold_sample(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SampleQuery>,
) -> Json<MoviesResponse<EnrichedMovie>> {
    let count = params.count.unwrap_or(DEFAULT_SAMPLE_SIZE);
    Json(state.recommendations.cold_start(count).await.into())
}
