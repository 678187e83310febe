use std::sync::Arc;

use crate::{
    artifacts::ArtifactStore,
    db::Store,
    error::{AppError, AppResult},
    models::{EnrichedMovie, MovieId, RankWindow},
    services::{
        cold_start, enrichment::Enricher, neighbors, providers::CatalogProvider, resolver,
    },
};

/// Title → similar movies pipeline
///
/// Resolves the title against the local model, picks a window of its nearest
/// neighbors and enriches them with catalog metadata. Titles the model does
/// not know fall back to the catalog's own similar-movies listing.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn Store>,
    artifacts: Arc<ArtifactStore>,
    catalog: Arc<dyn CatalogProvider>,
    enricher: Enricher,
    cold_start_cap: usize,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn Store>,
        artifacts: Arc<ArtifactStore>,
        catalog: Arc<dyn CatalogProvider>,
        enricher: Enricher,
        cold_start_cap: usize,
    ) -> Self {
        Self {
            store,
            artifacts,
            catalog,
            enricher,
            cold_start_cap,
        }
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Whether the recommendation model is in memory
    pub fn model_loaded(&self) -> bool {
        self.artifacts.loaded().is_some()
    }

    /// Movies similar to `title`, restricted to the ranks in `window`
    pub async fn recommend(&self, title: &str, window: RankWindow) -> AppResult<Vec<EnrichedMovie>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "Movie name cannot be empty".to_string(),
            ));
        }

        let artifacts = self.artifacts.load().await?;

        let canonical_id = match self.store.find_movie_by_title(title).await {
            Ok(found) => found.map(|m| m.external_id),
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Canonical movie lookup failed");
                None
            }
        };

        let Some(index) = resolver::resolve(&artifacts.movies, title, canonical_id) else {
            tracing::info!(title = %title, "Title not in model, trying catalog fallback");
            return self.catalog_fallback(title, window).await;
        };

        let ids = neighbors::neighbors(&artifacts, index, window);

        tracing::info!(
            title = %title,
            resolved = %artifacts.movies[index].title,
            row = index,
            window_start = window.start,
            window_end = window.end,
            candidates = ids.len(),
            "Recommendation candidates selected"
        );

        Ok(self.enricher.enrich(&ids).await)
    }

    /// Similar movies straight from the catalog, for titles the model lacks
    async fn catalog_fallback(&self, title: &str, window: RankWindow) -> AppResult<Vec<EnrichedMovie>> {
        let not_found = || AppError::NotFound(format!("'{}' not found in dataset.", title.to_lowercase()));

        let seed = match self.catalog.search_movies(title).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                tracing::warn!(title = %title, error = %e, "Catalog search fallback failed");
                None
            }
        };
        let Some(seed) = seed else {
            return Err(not_found());
        };

        let similar = match self.catalog.similar_movies(seed.id).await {
            Ok(similar) => similar,
            Err(e) => {
                tracing::warn!(title = %title, seed = seed.id, error = %e, "Catalog similar fallback failed");
                return Err(not_found());
            }
        };

        let movies: Vec<EnrichedMovie> = window
            .slice(&similar)
            .iter()
            .cloned()
            .map(EnrichedMovie::from)
            .collect();

        if movies.is_empty() {
            return Err(not_found());
        }

        tracing::info!(
            title = %title,
            seed = seed.id,
            results = movies.len(),
            provider = self.catalog.name(),
            "Served recommendations from catalog fallback"
        );

        Ok(movies)
    }

    /// Cold-start ids, `n` capped at the configured maximum
    pub async fn cold_start_ids(&self, n: usize) -> Vec<MovieId> {
        cold_start::sample(self.store.as_ref(), &self.artifacts, n, self.cold_start_cap).await
    }

    /// Enriched cold-start sample
    pub async fn cold_start(&self, n: usize) -> Vec<EnrichedMovie> {
        let ids = self.cold_start_ids(n).await;
        self.enricher.enrich(&ids).await
    }
}
