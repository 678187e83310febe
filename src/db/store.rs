use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CatalogMovie, HistoryAppend, MovieId, UserRecord},
};

/// Persistence collaborator for users, watch history and movie documents
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>>;

    /// Inserts a new user. Fails with `InvalidInput` if the email is taken.
    async fn insert_user(&self, user: UserRecord) -> AppResult<()>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Watch history for `email`, `None` when the user has never added a movie
    async fn history(&self, email: &str) -> AppResult<Option<Vec<MovieId>>>;

    /// Appends `movie_id` unless it is already in the history
    async fn append_history(&self, email: &str, movie_id: MovieId) -> AppResult<HistoryAppend>;

    /// Canonical movie document for a title
    ///
    /// Exact case-insensitive title match first, then substring match.
    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<CatalogMovie>>;

    /// Up to `n` random external ids from the movie document collection
    async fn sample_movie_ids(&self, n: usize) -> AppResult<Vec<MovieId>>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
