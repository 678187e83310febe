/// Movie catalog provider abstraction
///
/// The recommendation pipeline only knows about external movie ids. Display
/// metadata, text search and the catalog's own "similar movies" list come from
/// a provider behind this trait (TMDB in production, fakes in tests).
use thiserror::Error;

use crate::{
    error::AppResult,
    models::{MovieDetails, MovieId},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Failure of a single movie details lookup
///
/// Kept separate from `AppError` because the enricher decides per variant
/// whether to retry, and never surfaces it to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("movie not found in catalog")]
    NotFound,

    #[error("catalog returned status {0}")]
    Status(u16),

    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CatalogError::NotFound)
    }
}

/// Trait for movie catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch display metadata for one movie
    async fn movie_details(&self, id: MovieId) -> Result<MovieDetails, CatalogError>;

    /// Search movies by title, best match first
    async fn search_movies(&self, query: &str) -> AppResult<Vec<MovieDetails>>;

    /// The catalog's own list of movies similar to `id`
    async fn similar_movies(&self, id: MovieId) -> AppResult<Vec<MovieDetails>>;

    /// Highly rated movies above the given rating and vote count
    async fn top_rated(&self, min_rating: f64, min_votes: u32) -> AppResult<Vec<MovieDetails>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
