use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    models::{EnrichedMovie, MovieDetails, MovieId},
    services::providers::{CatalogError, CatalogProvider},
};

/// Retry and pacing settings for catalog lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per id, including the first
    pub max_attempts: u32,
    /// Base backoff; attempt `n` (from 0) is followed by `base_delay * 2^n`
    pub base_delay: Duration,
    /// Pause between consecutive ids in one batch
    pub request_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            request_interval: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.catalog_max_retries.max(1),
            base_delay: Duration::from_millis(config.catalog_retry_delay_ms),
            request_interval: Duration::from_millis(config.catalog_request_interval_ms),
        }
    }

    /// Sleep after failed attempt `attempt` (counted from 0)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Result of fetching one id, with what it took to get there
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub movie_id: MovieId,
    pub outcome: Result<MovieDetails, CatalogError>,
    pub attempts: u32,
    pub backoffs: Vec<Duration>,
}

impl FetchReport {
    pub fn into_enriched(self) -> EnrichedMovie {
        match self.outcome {
            Ok(details) => details.into(),
            Err(_) => EnrichedMovie::unavailable(self.movie_id),
        }
    }
}

/// Turns external ids into display records
///
/// Every id yields exactly one record, in input order. Lookups that fail for
/// good become `unavailable` placeholders instead of errors.
#[derive(Clone)]
pub struct Enricher {
    catalog: Arc<dyn CatalogProvider>,
    policy: RetryPolicy,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn CatalogProvider>, policy: RetryPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Enriches `ids` one after another, pausing between ids
    pub async fn enrich(&self, ids: &[MovieId]) -> Vec<EnrichedMovie> {
        let mut movies = Vec::with_capacity(ids.len());

        for (i, &id) in ids.iter().enumerate() {
            if i > 0 && !self.policy.request_interval.is_zero() {
                tokio::time::sleep(self.policy.request_interval).await;
            }
            movies.push(self.fetch_with_retry(id).await.into_enriched());
        }

        let unavailable = movies.iter().filter(|m| !m.is_available()).count();
        if unavailable > 0 {
            tracing::warn!(
                requested = ids.len(),
                unavailable,
                provider = self.catalog.name(),
                "Substituted placeholders for unavailable movies"
            );
        }

        movies
    }

    /// Fetches one id under the retry policy
    ///
    /// A 404 is final after one attempt. Any other failure is retried with
    /// exponential backoff until the attempt budget runs out.
    pub async fn fetch_with_retry(&self, id: MovieId) -> FetchReport {
        let mut backoffs = Vec::new();
        let mut attempt = 0;

        loop {
            let result = self.catalog.movie_details(id).await;
            let attempts = attempt + 1;

            match result {
                Ok(details) => {
                    return FetchReport {
                        movie_id: id,
                        outcome: Ok(details),
                        attempts,
                        backoffs,
                    };
                }
                Err(e) if !e.is_retryable() => {
                    tracing::debug!(movie_id = id, "Movie absent from catalog");
                    return FetchReport {
                        movie_id: id,
                        outcome: Err(e),
                        attempts,
                        backoffs,
                    };
                }
                Err(e) if attempts >= self.policy.max_attempts => {
                    tracing::warn!(
                        movie_id = id,
                        attempts,
                        error = %e,
                        "Giving up on movie after retries"
                    );
                    return FetchReport {
                        movie_id: id,
                        outcome: Err(e),
                        attempts,
                        backoffs,
                    };
                }
                Err(e) => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        movie_id = id,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Movie fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    backoffs.push(delay);
                    attempt += 1;
                }
            }
        }
    }
}
