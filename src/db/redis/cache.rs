use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::MovieId;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    MovieDetails(MovieId),
    MovieSearch(String),
    SimilarMovies(MovieId),
    TopRated { min_rating: f64, min_votes: u32 },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::MovieDetails(id) => write!(f, "movie:{}", id),
            CacheKey::MovieSearch(query) => write!(f, "search:{}", query.trim().to_lowercase()),
            CacheKey::SimilarMovies(id) => write!(f, "similar:{}", id),
            CacheKey::TopRated {
                min_rating,
                min_votes,
            } => write!(f, "top_rated:{}:{}", min_rating, min_votes),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving catalog responses in Redis
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with a background writer task
    ///
    /// Writes go through a channel so caching never delays a response.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                msg = write_rx.recv() => match msg {
                    Some(msg) => Self::store(&client, msg).await,
                    None => break,
                },
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        Self::store(&client, msg).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Catalog cache writer stopped");
                    break;
                }
            }
        }
    }

    async fn store(client: &Client, msg: CacheWriteMessage) {
        let key = msg.key.clone();
        if let Err(e) = Self::write_to_redis(client, msg).await {
            tracing::warn!(key = %key, error = %e, "Catalog cache write dropped");
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Retrieves a value from the cache by key
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Like `get_from_cache`, but an unreachable or corrupt cache reads as a miss
    pub async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.get_from_cache(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Queues a value for writing without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieDetails;

    #[test]
    fn test_cache_key_display_movie_details() {
        assert_eq!(CacheKey::MovieDetails(603).to_string(), "movie:603");
    }

    #[test]
    fn test_cache_key_display_search_normalized() {
        let key = CacheKey::MovieSearch("  THE Matrix ".to_string());
        assert_eq!(key.to_string(), "search:the matrix");
    }

    #[test]
    fn test_cache_key_display_similar() {
        assert_eq!(CacheKey::SimilarMovies(27205).to_string(), "similar:27205");
    }

    #[test]
    fn test_cache_key_display_top_rated() {
        let key = CacheKey::TopRated {
            min_rating: 7.5,
            min_votes: 1000,
        };
        assert_eq!(key.to_string(), "top_rated:7.5:1000");
    }

    #[tokio::test]
    async fn test_unreachable_redis_reads_as_miss() {
        // Port 1 is never a Redis server.
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);

        let hit: Option<Vec<String>> = cache.lookup(&CacheKey::MovieDetails(1)).await;
        assert_eq!(hit, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_movie_details_written_before_shutdown_completes() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let (cache, handle) = Cache::new(create_redis_client(&redis_url).unwrap());

        let key = CacheKey::MovieDetails(-603);
        let details = MovieDetails {
            id: -603,
            title: "The Matrix".to_string(),
            overview: None,
            poster_path: Some("/matrix.jpg".to_string()),
            release_date: Some("1999-03-30".to_string()),
            vote_average: Some(8.2),
        };

        cache.set_in_background(&key, &details, 5);
        handle.shutdown().await;
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let hit: Option<MovieDetails> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(hit, Some(details));
    }
}
