use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{CatalogMovie, HistoryAppend, MovieId, UserRecord},
};

/// In-process store for local runs and tests
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<Uuid, UserRecord>,
    history: HashMap<String, Vec<MovieId>>,
    movie_documents: Vec<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with movie documents
    pub fn with_movie_documents(documents: Vec<Value>) -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                movie_documents: documents,
                ..Default::default()
            }),
        }
    }

    fn movies(inner: &MemoryStoreInner) -> impl Iterator<Item = CatalogMovie> + '_ {
        inner
            .movie_documents
            .iter()
            .filter_map(CatalogMovie::from_document)
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: UserRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::InvalidInput("User already registered".to_string()));
        }
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.get_mut(&id) {
            user.last_log_date = Some(at);
        }
        Ok(())
    }

    async fn history(&self, email: &str) -> AppResult<Option<Vec<MovieId>>> {
        let inner = self.inner.read().await;
        Ok(inner.history.get(email).cloned())
    }

    async fn append_history(&self, email: &str, movie_id: MovieId) -> AppResult<HistoryAppend> {
        let mut inner = self.inner.write().await;
        match inner.history.get_mut(email) {
            None => {
                inner.history.insert(email.to_string(), vec![movie_id]);
                Ok(HistoryAppend::Created)
            }
            Some(list) if list.contains(&movie_id) => Ok(HistoryAppend::AlreadyPresent),
            Some(list) => {
                list.push(movie_id);
                Ok(HistoryAppend::Appended)
            }
        }
    }

    async fn find_movie_by_title(&self, title: &str) -> AppResult<Option<CatalogMovie>> {
        let query = title.trim().to_lowercase();
        if query.is_empty() {
            return Ok(None);
        }

        let inner = self.inner.read().await;
        let exact = Self::movies(&inner).find(|m| m.title.trim().to_lowercase() == query);
        Ok(exact.or_else(|| Self::movies(&inner).find(|m| m.title.to_lowercase().contains(&query))))
    }

    async fn sample_movie_ids(&self, n: usize) -> AppResult<Vec<MovieId>> {
        let inner = self.inner.read().await;
        let ids: Vec<MovieId> = Self::movies(&inner).map(|m| m.external_id).collect();
        Ok(ids.choose_multiple(&mut rand::rng(), n).copied().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(email: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            genres: vec![],
            signin_date: Utc::now(),
            last_log_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = MemoryStore::new();
        let ada = user("ada@example.com");
        store.insert_user(ada.clone()).await.unwrap();

        assert_eq!(store.find_user_by_email("ada@example.com").await.unwrap(), Some(ada.clone()));
        assert_eq!(store.find_user_by_id(ada.id).await.unwrap(), Some(ada));
        assert_eq!(store.find_user_by_email("bob@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_user(user("ada@example.com")).await.unwrap();
        let result = store.insert_user(user("ada@example.com")).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_record_login() {
        let store = MemoryStore::new();
        let ada = user("ada@example.com");
        store.insert_user(ada.clone()).await.unwrap();

        let at = Utc::now();
        store.record_login(ada.id, at).await.unwrap();
        let found = store.find_user_by_id(ada.id).await.unwrap().unwrap();
        assert_eq!(found.last_log_date, Some(at));
    }

    #[tokio::test]
    async fn test_history_append_semantics() {
        let store = MemoryStore::new();
        assert_eq!(store.history("ada@example.com").await.unwrap(), None);

        assert_eq!(
            store.append_history("ada@example.com", 603).await.unwrap(),
            HistoryAppend::Created
        );
        assert_eq!(
            store.append_history("ada@example.com", 27205).await.unwrap(),
            HistoryAppend::Appended
        );
        assert_eq!(
            store.append_history("ada@example.com", 603).await.unwrap(),
            HistoryAppend::AlreadyPresent
        );
        assert_eq!(
            store.history("ada@example.com").await.unwrap(),
            Some(vec![603, 27205])
        );
    }

    #[tokio::test]
    async fn test_find_movie_by_title_prefers_exact() {
        let store = MemoryStore::with_movie_documents(vec![
            json!({ "title": "The Matrix Reloaded", "tmdb_id": 604 }),
            json!({ "title": "The Matrix", "movieId": 603 }),
            json!({ "title": "Untitled" }),
        ]);

        let found = store.find_movie_by_title("THE MATRIX").await.unwrap().unwrap();
        assert_eq!(found.external_id, 603);

        let found = store.find_movie_by_title("reloaded").await.unwrap().unwrap();
        assert_eq!(found.external_id, 604);

        assert!(store.find_movie_by_title("Casablanca").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sample_movie_ids() {
        let docs = (1..=10)
            .map(|i| json!({ "title": format!("Movie {}", i), "id": i }))
            .collect();
        let store = MemoryStore::with_movie_documents(docs);

        let sample = store.sample_movie_ids(4).await.unwrap();
        assert_eq!(sample.len(), 4);
        assert!(sample.iter().all(|id| (1..=10).contains(id)));

        let mut all = store.sample_movie_ids(50).await.unwrap();
        all.sort();
        assert_eq!(all, (1..=10).collect::<Vec<_>>());
    }
}
