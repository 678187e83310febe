use rand::seq::IndexedRandom;

use crate::{artifacts::ArtifactStore, db::Store, models::MovieId};

/// Default cold-start sample size
pub const DEFAULT_SAMPLE_SIZE: usize = 30;

/// Well-known TMDB ids shown when no live source can produce a sample
pub const FALLBACK_MOVIE_IDS: [MovieId; 30] = [
    603, 27205, 155, 550, 680, 13, 278, 238, 157336, 24428, 120, 122, 11, 1891, 105, 329, 597,
    19995, 299536, 862, 12, 14160, 150540, 354912, 769, 807, 274, 424, 389, 240,
];

/// Pseudo-random ids for first-time visitors
///
/// Sources are tried in order: the live movie document collection, the
/// loaded movie table, then `FALLBACK_MOVIE_IDS`. The first non-empty
/// result wins and no tier's failure reaches the caller.
pub async fn sample(store: &dyn Store, artifacts: &ArtifactStore, n: usize, cap: usize) -> Vec<MovieId> {
    let n = n.min(cap);
    if n == 0 {
        return Vec::new();
    }

    match store.sample_movie_ids(n).await {
        Ok(ids) if !ids.is_empty() => {
            tracing::debug!(count = ids.len(), source = store.name(), "Cold-start sample from store");
            return ids;
        }
        Ok(_) => tracing::debug!(source = store.name(), "Store has no movie documents to sample"),
        Err(e) => tracing::warn!(source = store.name(), error = %e, "Store sampling failed"),
    }

    if let Some(loaded) = artifacts.loaded() {
        let ids: Vec<MovieId> = loaded
            .movies
            .choose_multiple(&mut rand::rng(), n)
            .map(|m| m.external_id)
            .collect();
        if !ids.is_empty() {
            tracing::debug!(count = ids.len(), source = "artifacts", "Cold-start sample from movie table");
            return ids;
        }
    }

    tracing::warn!(count = n, "Cold-start sample falling back to built-in movie list");
    fallback_ids(n)
}

/// `FALLBACK_MOVIE_IDS` cycled or truncated to exactly `n` ids
pub fn fallback_ids(n: usize) -> Vec<MovieId> {
    FALLBACK_MOVIE_IDS.iter().copied().cycle().take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactSource, Artifacts, SimilarityMatrix};
    use crate::db::MemoryStore;
    use crate::error::{AppError, AppResult};
    use crate::models::{CatalogMovie, HistoryAppend, MovieRecord, UserRecord};
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use uuid::Uuid;

    /// Store whose every call fails, as if the database were down
    struct DownStore;

    #[async_trait::async_trait]
    impl Store for DownStore {
        async fn find_user_by_email(&self, _: &str) -> AppResult<Option<UserRecord>> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn find_user_by_id(&self, _: Uuid) -> AppResult<Option<UserRecord>> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn insert_user(&self, _: UserRecord) -> AppResult<()> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn record_login(&self, _: Uuid, _: DateTime<Utc>) -> AppResult<()> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn history(&self, _: &str) -> AppResult<Option<Vec<MovieId>>> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn append_history(&self, _: &str, _: MovieId) -> AppResult<HistoryAppend> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn find_movie_by_title(&self, _: &str) -> AppResult<Option<CatalogMovie>> {
            Err(AppError::Internal("down".to_string()))
        }
        async fn sample_movie_ids(&self, _: usize) -> AppResult<Vec<MovieId>> {
            Err(AppError::Internal("down".to_string()))
        }
        fn name(&self) -> &'static str {
            "down"
        }
    }

    fn empty_source() -> ArtifactSource {
        ArtifactSource {
            dir: "/nonexistent".into(),
            movies_file: "movies.json".to_string(),
            matrix_file: "similarity.bin".to_string(),
            movies_url: None,
            matrix_url: None,
        }
    }

    fn unloaded_artifacts() -> ArtifactStore {
        ArtifactStore::new(empty_source(), reqwest::Client::new())
    }

    fn loaded_artifacts() -> ArtifactStore {
        let movies: Vec<MovieRecord> = (0..5)
            .map(|i| MovieRecord {
                external_id: 900 + i,
                title: format!("Movie {}", i),
                tags: String::new(),
            })
            .collect();
        let matrix = SimilarityMatrix::new(5, 1, vec![1.0; 5]).unwrap();
        ArtifactStore::preloaded(empty_source(), Artifacts::new(movies, matrix).unwrap())
    }

    #[tokio::test]
    async fn test_store_tier_wins() {
        let docs = (1..=40).map(|i| json!({ "title": format!("M{}", i), "id": i })).collect();
        let store = MemoryStore::with_movie_documents(docs);

        let ids = sample(&store, &loaded_artifacts(), 30, 72).await;
        assert_eq!(ids.len(), 30);
        assert!(ids.iter().all(|id| (1..=40).contains(id)));
    }

    #[tokio::test]
    async fn test_artifact_tier_when_store_down() {
        let ids = sample(&DownStore, &loaded_artifacts(), 30, 72).await;
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| (900..905).contains(id)));
    }

    #[tokio::test]
    async fn test_artifact_tier_when_store_empty() {
        let ids = sample(&MemoryStore::new(), &loaded_artifacts(), 3, 72).await;
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_when_everything_unavailable() {
        let ids = sample(&DownStore, &unloaded_artifacts(), 30, 72).await;
        assert_eq!(ids, FALLBACK_MOVIE_IDS.to_vec());
    }

    #[tokio::test]
    async fn test_fallback_respects_cap() {
        let ids = sample(&DownStore, &unloaded_artifacts(), 100, 72).await;
        assert_eq!(ids.len(), 72);

        let ids = sample(&DownStore, &unloaded_artifacts(), 10, 72).await;
        assert_eq!(ids, FALLBACK_MOVIE_IDS[..10].to_vec());
    }

    #[test]
    fn test_fallback_ids_cycle() {
        let ids = fallback_ids(45);
        assert_eq!(ids.len(), 45);
        assert_eq!(ids[30], FALLBACK_MOVIE_IDS[0]);
        assert!(fallback_ids(0).is_empty());
    }
}
