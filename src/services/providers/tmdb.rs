/// TMDB (The Movie Database) v3 provider
///
/// API Flow:
/// 1. Details: /movie/{id} → metadata for enrichment (404 when the id is unknown)
/// 2. Search: /search/movie?query= → ranked results, used to find a catalog id for a title
/// 3. Similar: /movie/{id}/similar → fallback recommendations when the local model has no match
/// 4. Discover: /discover/movie → top rated listing
///
/// Every request carries the API key as a query parameter. The per-request
/// timeout is set on the HTTP client.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{MovieDetails, MovieId},
    services::providers::{CatalogError, CatalogProvider},
};

const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const LIST_CACHE_TTL: u64 = 3600; // 1 hour

#[derive(Debug, Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<MovieDetails>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(
        cache: Option<Cache>,
        api_key: String,
        api_url: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// GETs a listing endpoint and returns its `results`
    async fn fetch_results(&self, path: &str, params: &[(&str, String)]) -> AppResult<Vec<MovieDetails>> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::ExternalService {
                status: status.as_u16(),
                message: format!("TMDB returned status {}: {}", status, body),
            });
        }

        let page: ResultsPage = response.json().await?;
        Ok(page.results)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn movie_details(&self, id: MovieId) -> Result<MovieDetails, CatalogError> {
        cached!(
            self.cache.as_ref(),
            CacheKey::MovieDetails(id),
            DETAILS_CACHE_TTL,
            async move {
                let url = format!("{}/movie/{}", self.api_url, id);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", self.api_key.as_str())])
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            CatalogError::Transport(format!("timed out: {}", e))
                        } else {
                            CatalogError::Transport(e.to_string())
                        }
                    })?;

                let status = response.status();
                if status == StatusCode::NOT_FOUND {
                    return Err(CatalogError::NotFound);
                }
                if !status.is_success() {
                    return Err(CatalogError::Status(status.as_u16()));
                }

                let details: MovieDetails = response
                    .json()
                    .await
                    .map_err(|e| CatalogError::Decode(e.to_string()))?;

                tracing::debug!(movie_id = id, title = %details.title, provider = "tmdb", "Movie details fetched");

                Ok(details)
            }
        )
    }

    async fn search_movies(&self, query: &str) -> AppResult<Vec<MovieDetails>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache.as_ref(),
            CacheKey::MovieSearch(query.to_string()),
            LIST_CACHE_TTL,
            async move {
                let movies = self
                    .fetch_results("/search/movie", &[("query", query.to_string())])
                    .await?;

                tracing::info!(
                    query = %query,
                    results = movies.len(),
                    provider = "tmdb",
                    "Movie search completed"
                );

                Ok::<_, AppError>(movies)
            }
        )
    }

    async fn similar_movies(&self, id: MovieId) -> AppResult<Vec<MovieDetails>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::SimilarMovies(id),
            LIST_CACHE_TTL,
            async move {
                let movies = self
                    .fetch_results(&format!("/movie/{}/similar", id), &[])
                    .await?;

                tracing::info!(
                    movie_id = id,
                    results = movies.len(),
                    provider = "tmdb",
                    "Similar movies fetched"
                );

                Ok::<_, AppError>(movies)
            }
        )
    }

    async fn top_rated(&self, min_rating: f64, min_votes: u32) -> AppResult<Vec<MovieDetails>> {
        cached!(
            self.cache.as_ref(),
            CacheKey::TopRated {
                min_rating,
                min_votes
            },
            LIST_CACHE_TTL,
            async move {
                self.fetch_results(
                    "/discover/movie",
                    &[
                        ("sort_by", "vote_average.desc".to_string()),
                        ("vote_average.gte", min_rating.to_string()),
                        ("vote_count.gte", min_votes.to_string()),
                    ],
                )
                .await
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
