use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod auth;
pub mod catalog;
pub mod history;
pub mod recommendations;

/// `{"movies": [...]}` envelope shared by list endpoints
#[derive(Debug, Serialize)]
pub struct MoviesResponse<T> {
    pub movies: Vec<T>,
}

impl<T> From<Vec<T>> for MoviesResponse<T> {
    fn from(movies: Vec<T>) -> Self {
        Self { movies }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/token", post(auth::token))
        .route("/current_user", get(auth::current_user))
        // Watch history
        .route("/user/history", get(history::list).post(history::add))
        // Kept for clients that still call the old trailing-slash path
        .route("/user/history/", get(history::list).post(history::add))
        // Recommendations
        .route("/top_6", get(recommendations::top_6))
        .route("/top_6_to_12", get(recommendations::top_6_to_12))
        .route("/recommendations", get(recommendations::window))
        .route("/cold-sample", get(recommendations::cold_sample))
        // Catalog
        .route("/search", get(catalog::search))
        .route("/top-rated", get(catalog::top_rated))
        .route("/movie/:id", get(catalog::movie))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "model_loaded": state.recommendations.model_loaded()
        })),
    )
}
