//! Offline recommendation artifacts
//!
//! The movie table and the similarity matrix are loaded together, once, on
//! first access. Missing files are fetched from their configured download
//! source before decoding. Concurrent first callers share a single load.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client as HttpClient;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::models::MovieRecord;

pub mod download;
pub mod matrix;

pub use matrix::{MatrixFormatError, SimilarityMatrix};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("{0} is missing and no download source is configured")]
    NotConfigured(String),

    #[error("Artifact download failed: {0}")]
    Download(String),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid movie table: {0}")]
    Table(#[from] serde_json::Error),

    #[error("Invalid similarity matrix: {0}")]
    Matrix(#[from] MatrixFormatError),

    #[error("Movie table has {movies} rows but similarity matrix has {matrix}")]
    RowMismatch { movies: usize, matrix: usize },
}

/// Where the artifacts live and where to fetch them from
#[derive(Debug, Clone)]
pub struct ArtifactSource {
    pub dir: PathBuf,
    pub movies_file: String,
    pub matrix_file: String,
    pub movies_url: Option<String>,
    pub matrix_url: Option<String>,
}

impl ArtifactSource {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.artifact_dir.clone(),
            movies_file: config.movies_artifact.clone(),
            matrix_file: config.matrix_artifact.clone(),
            movies_url: config.movies_artifact_url.clone(),
            matrix_url: config.matrix_artifact_url.clone(),
        }
    }

    pub fn movies_path(&self) -> PathBuf {
        self.dir.join(&self.movies_file)
    }

    pub fn matrix_path(&self) -> PathBuf {
        self.dir.join(&self.matrix_file)
    }
}

/// The loaded movie table and its aligned similarity matrix
#[derive(Debug)]
pub struct Artifacts {
    pub movies: Vec<MovieRecord>,
    pub matrix: SimilarityMatrix,
}

impl Artifacts {
    /// Pairs a table with a matrix, enforcing one matrix row per movie
    pub fn new(movies: Vec<MovieRecord>, matrix: SimilarityMatrix) -> Result<Self, ArtifactError> {
        if movies.len() != matrix.rows() {
            return Err(ArtifactError::RowMismatch {
                movies: movies.len(),
                matrix: matrix.rows(),
            });
        }
        Ok(Self { movies, matrix })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

/// Lazily loaded, process-lifetime artifact cache
pub struct ArtifactStore {
    source: ArtifactSource,
    http_client: HttpClient,
    loaded: OnceCell<Arc<Artifacts>>,
}

impl ArtifactStore {
    pub fn new(source: ArtifactSource, http_client: HttpClient) -> Self {
        Self {
            source,
            http_client,
            loaded: OnceCell::new(),
        }
    }

    /// Store for `config`, with every download bounded by `artifact_timeout_secs`
    pub fn from_config(config: &Config) -> Result<Self, ArtifactError> {
        let http_client = HttpClient::builder()
            .connect_timeout(config.catalog_timeout())
            .timeout(config.artifact_timeout())
            .build()
            .map_err(|e| ArtifactError::Download(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self::new(ArtifactSource::from_config(config), http_client))
    }

    /// Wraps artifacts that are already in memory
    pub fn preloaded(source: ArtifactSource, artifacts: Artifacts) -> Self {
        Self {
            source,
            http_client: HttpClient::new(),
            loaded: OnceCell::new_with(Some(Arc::new(artifacts))),
        }
    }

    /// Returns the artifacts, loading them on first call
    ///
    /// A failed load is not remembered; the next call tries again.
    pub async fn load(&self) -> Result<Arc<Artifacts>, ArtifactError> {
        self.loaded
            .get_or_try_init(|| async {
                let artifacts = self.load_from_disk().await?;
                tracing::info!(
                    movies = artifacts.len(),
                    matrix_cols = artifacts.matrix.cols(),
                    pairwise = artifacts.matrix.is_pairwise(),
                    "Recommendation artifacts loaded"
                );
                Ok::<_, ArtifactError>(Arc::new(artifacts))
            })
            .await
            .cloned()
    }

    /// Returns the artifacts only if a previous load succeeded
    pub fn loaded(&self) -> Option<Arc<Artifacts>> {
        self.loaded.get().cloned()
    }

    async fn load_from_disk(&self) -> Result<Artifacts, ArtifactError> {
        let movies_path = self.source.movies_path();
        let matrix_path = self.source.matrix_path();

        self.ensure_present(&movies_path, self.source.movies_url.as_deref())
            .await?;
        self.ensure_present(&matrix_path, self.source.matrix_url.as_deref())
            .await?;

        let movies_bytes = tokio::fs::read(&movies_path).await?;
        let movies: Vec<MovieRecord> = serde_json::from_slice(&movies_bytes)?;

        let matrix_bytes = tokio::fs::read(&matrix_path).await?;
        let matrix = SimilarityMatrix::from_bytes(&matrix_bytes)?;

        Artifacts::new(movies, matrix)
    }

    async fn ensure_present(&self, path: &Path, url: Option<&str>) -> Result<(), ArtifactError> {
        if tokio::fs::try_exists(path).await? {
            return Ok(());
        }

        match url {
            Some(url) => {
                download::download_artifact(&self.http_client, url, path).await?;
                Ok(())
            }
            None => Err(ArtifactError::NotConfigured(path.display().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use serde_json::json;

    fn source_in(dir: &Path) -> ArtifactSource {
        ArtifactSource {
            dir: dir.to_path_buf(),
            movies_file: "movies.json".to_string(),
            matrix_file: "similarity.bin".to_string(),
            movies_url: None,
            matrix_url: None,
        }
    }

    fn sample_movies() -> serde_json::Value {
        json!([
            { "id": 603, "title": "The Matrix", "tags": "hacker simulation" },
            { "id": 604, "title": "The Matrix Reloaded", "tags": "hacker sequel" }
        ])
    }

    fn sample_matrix() -> SimilarityMatrix {
        SimilarityMatrix::from_rows(vec![vec![1.0, 0.8], vec![0.8, 1.0]]).unwrap()
    }

    fn write_artifacts(dir: &Path) {
        std::fs::write(dir.join("movies.json"), sample_movies().to_string()).unwrap();
        std::fs::write(dir.join("similarity.bin"), sample_matrix().to_bytes()).unwrap();
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_load_from_local_files() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());

        let store = ArtifactStore::new(source_in(dir.path()), HttpClient::new());
        assert!(store.loaded().is_none());

        let artifacts = store.load().await.unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts.movies[1].title, "The Matrix Reloaded");
        assert!(store.loaded().is_some());
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());

        let store = ArtifactStore::new(source_in(dir.path()), HttpClient::new());
        let first = store.load().await.unwrap();

        // Files vanishing after the first load must not matter.
        std::fs::remove_file(dir.path().join("movies.json")).unwrap();
        let second = store.load().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_without_source_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(source_in(dir.path()), HttpClient::new());

        let result = store.load().await;
        assert!(matches!(result, Err(ArtifactError::NotConfigured(_))));
        assert!(store.loaded().is_none());
    }

    #[tokio::test]
    async fn test_row_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movies.json"), sample_movies().to_string()).unwrap();
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.1, 0.2],
            vec![0.1, 1.0, 0.3],
            vec![0.2, 0.3, 1.0],
        ])
        .unwrap();
        std::fs::write(dir.path().join("similarity.bin"), matrix.to_bytes()).unwrap();

        let store = ArtifactStore::new(source_in(dir.path()), HttpClient::new());
        let result = store.load().await;
        assert!(matches!(
            result,
            Err(ArtifactError::RowMismatch { movies: 2, matrix: 3 })
        ));
    }

    #[tokio::test]
    async fn test_downloads_missing_artifacts() {
        let matrix_bytes = sample_matrix().to_bytes();
        let router = Router::new()
            .route("/movies.json", get(|| async { sample_movies().to_string() }))
            .route("/similarity.bin", get(move || async move { matrix_bytes }));
        let base = serve(router).await;

        let dir = tempfile::tempdir().unwrap();
        let mut source = source_in(dir.path());
        source.movies_url = Some(format!("{}/movies.json", base));
        source.matrix_url = Some(format!("{}/similarity.bin", base));

        let store = ArtifactStore::new(source.clone(), HttpClient::new());
        let artifacts = store.load().await.unwrap();

        assert_eq!(artifacts.len(), 2);
        assert!(source.movies_path().exists());
        assert!(source.matrix_path().exists());
        assert!(!download::partial_path(&source.matrix_path()).exists());
    }

    #[tokio::test]
    async fn test_failed_download_discards_partial_file() {
        let router = Router::new().route(
            "/similarity.bin",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(router).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movies.json"), sample_movies().to_string()).unwrap();
        let mut source = source_in(dir.path());
        source.matrix_url = Some(format!("{}/similarity.bin", base));

        let store = ArtifactStore::new(source.clone(), HttpClient::new());
        let result = store.load().await;

        assert!(matches!(result, Err(ArtifactError::Download(_))));
        assert!(!source.matrix_path().exists());
        assert!(!download::partial_path(&source.matrix_path()).exists());
    }

    #[tokio::test]
    async fn test_unresponsive_download_times_out() {
        // Accepts connections and holds them open without ever replying.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let mut source = source_in(dir.path());
        source.movies_url = Some(format!("http://{}/movies.json", addr));

        let http_client = HttpClient::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let store = ArtifactStore::new(source.clone(), http_client);

        let result = tokio::time::timeout(std::time::Duration::from_secs(10), store.load())
            .await
            .expect("load should give up on its own");

        assert!(matches!(result, Err(ArtifactError::Download(_))));
        assert!(!download::partial_path(&source.movies_path()).exists());
        assert!(store.loaded().is_none());
    }

    #[tokio::test]
    async fn test_store_from_config_reports_missing_artifacts() {
        let vars = [
            ("TMDB_API_KEY", "key"),
            ("JWT_SECRET", "secret"),
            ("ARTIFACT_TIMEOUT_SECS", "1"),
            ("ARTIFACT_DIR", "/nonexistent"),
        ];
        let config: Config =
            envy::from_iter(vars.iter().map(|(k, v)| (k.to_string(), v.to_string()))).unwrap();

        let store = ArtifactStore::from_config(&config).unwrap();
        assert!(matches!(store.load().await, Err(ArtifactError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_concurrent_first_access_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());

        let store = Arc::new(ArtifactStore::new(source_in(dir.path()), HttpClient::new()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.load().await.unwrap() })
            })
            .collect();

        let mut loaded = Vec::new();
        for handle in handles {
            loaded.push(handle.await.unwrap());
        }

        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
