use std::sync::Arc;

use crate::{
    artifacts::ArtifactStore,
    config::Config,
    db::Store,
    error::AppResult,
    services::{CatalogProvider, Enricher, RecommendationService, RetryPolicy, TokenIssuer},
};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub recommendations: RecommendationService,
    pub tokens: TokenIssuer,
    /// Allowed CORS origins; empty means any origin
    pub allowed_origins: Vec<String>,
}

impl AppState {
    /// Wires services from configuration around the given collaborators
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        catalog: Arc<dyn CatalogProvider>,
        artifacts: Arc<ArtifactStore>,
    ) -> AppResult<Self> {
        let enricher = Enricher::new(catalog.clone(), RetryPolicy::from_config(config));
        let recommendations = RecommendationService::new(
            store.clone(),
            artifacts,
            catalog.clone(),
            enricher,
            config.cold_start_cap,
        );

        Ok(Self {
            store,
            catalog,
            recommendations,
            tokens: TokenIssuer::from_config(config)?,
            allowed_origins: config.allowed_origins(),
        })
    }

    pub fn enricher(&self) -> &Enricher {
        self.recommendations.enricher()
    }
}
