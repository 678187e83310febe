use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelmatch_api::{
    artifacts::ArtifactStore,
    config::{Config, StorageBackend},
    create_router,
    db::{create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgStore, Store},
    services::{CatalogProvider, TmdbProvider},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelmatch_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(backend = store.name(), "Storage ready");

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?);
            (Some(cache), Some(handle))
        }
        None => {
            info!("REDIS_URL not set, catalog responses will not be cached");
            (None, None)
        }
    };

    let catalog: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.catalog_timeout(),
    )?);

    let artifacts = Arc::new(ArtifactStore::from_config(&config)?);
    match artifacts.load().await {
        Ok(loaded) => info!(movies = loaded.len(), "Recommendation model loaded"),
        Err(e) => tracing::warn!(error = %e, "Recommendation model unavailable at startup, will retry on demand"),
    }

    let state = Arc::new(AppState::new(&config, store, catalog, artifacts)?);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
