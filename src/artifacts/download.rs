use std::path::{Path, PathBuf};

use reqwest::Client as HttpClient;
use tokio::{fs, io::AsyncWriteExt};

use super::ArtifactError;

/// Temporary path a download streams into before being renamed over `dest`
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads `url` into `dest`
///
/// The body is streamed to a `.part` file next to `dest` and renamed into place
/// once complete. On any failure the partial file is removed, so a corrupt
/// artifact is never left behind for the next load.
pub async fn download_artifact(
    http_client: &HttpClient,
    url: &str,
    dest: &Path,
) -> Result<u64, ArtifactError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = partial_path(dest);
    match stream_to_file(http_client, url, &tmp).await {
        Ok(bytes) => {
            if let Err(e) = fs::rename(&tmp, dest).await {
                discard(&tmp).await;
                return Err(e.into());
            }
            tracing::info!(url = %url, path = %dest.display(), bytes, "Artifact downloaded");
            Ok(bytes)
        }
        Err(e) => {
            discard(&tmp).await;
            tracing::error!(url = %url, error = %e, "Artifact download failed");
            Err(e)
        }
    }
}

async fn stream_to_file(http_client: &HttpClient, url: &str, tmp: &Path) -> Result<u64, ArtifactError> {
    tracing::info!(url = %url, "Downloading artifact");

    let mut response = http_client
        .get(url)
        .send()
        .await
        .map_err(|e| ArtifactError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ArtifactError::Download(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    let mut file = fs::File::create(tmp).await?;
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ArtifactError::Download(e.to_string()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove partial artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/data/similarity.bin")),
            PathBuf::from("/data/similarity.bin.part")
        );
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("movies.json");

        // Nothing listens on port 9 locally, so the connection is refused.
        let result = download_artifact(&HttpClient::new(), "http://127.0.0.1:9/movies.json", &dest).await;

        assert!(matches!(result, Err(ArtifactError::Download(_))));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
