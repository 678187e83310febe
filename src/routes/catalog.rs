use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{EnrichedMovie, MovieDetails, MovieId},
    routes::MoviesResponse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
pub struct TopRatedQuery {
    #[serde(default = "default_min_rating")]
    min_rating: f64,
    #[serde(default = "default_min_votes")]
    min_votes: u32,
}

fn default_min_rating() -> f64 {
    7.0
}

fn default_min_votes() -> u32 {
    1000
}

/// Title search passthrough
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<MoviesResponse<MovieDetails>>> {
    let movies = state.catalog.search_movies(&params.query).await?;
    Ok(Json(movies.into()))
}

/// Highly rated movies passthrough
pub async fn top_rated(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopRatedQuery>,
) -> AppResult<Json<MoviesResponse<MovieDetails>>> {
    let movies = state
        .catalog
        .top_rated(params.min_rating, params.min_votes)
        .await?;
    Ok(Json(movies.into()))
}

/// One movie, or its placeholder when the catalog cannot supply it
pub async fn movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MovieId>,
) -> Json<EnrichedMovie> {
    Json(state.enricher().fetch_with_retry(id).await.into_enriched())
}
