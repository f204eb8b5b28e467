//! Local persistence for scrape output: cover images on disk and a
//! timestamped JSON dump of every run's results.

use kiosko_common::ScrapeRunResult;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Downloads article cover images into a flat directory, one file per
/// article id. Failures are logged and swallowed; a missing image never
/// fails a scrape.
pub struct ImageStore {
    dir: PathBuf,
    client: reqwest::Client,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StorageError::Io {
                path: dir.clone(),
                source: std::io::Error::other(e),
            })?;
        Ok(Self { dir, client })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch `url` and write it to `<dir>/<article_id>.<ext>`. Returns the
    /// written path, or `None` if the download or write failed. Re-running
    /// for the same article overwrites the previous file.
    pub async fn download(&self, article_id: &str, url: &Url) -> Option<PathBuf> {
        let ext = extension_for(url);
        let path = self.dir.join(format!("{article_id}.{ext}"));

        let bytes = match self.fetch(url).await {
            Ok(bytes) => bytes,
            Err(reason) => {
                tracing::warn!(%url, article_id, %reason, "image download failed; skipping");
                return None;
            }
        };

        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "image write failed; skipping");
            return None;
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "image saved");
        Some(path)
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, String> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("status {}", resp.status()));
        }
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty body".to_string());
        }
        Ok(bytes.to_vec())
    }
}

/// File extension taken from the URL path, defaulting to jpg for paths
/// without a recognizable one.
fn extension_for(url: &Url) -> String {
    let path = url.path();
    path.rsplit('.')
        .next()
        .filter(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "webp" | "avif"
            )
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

/// Writes the full set of run results as a single timestamped JSON file.
pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, results: &[ScrapeRunResult]) -> Result<PathBuf, StorageError> {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("scraping_results_{stamp}.json"));
        let body = serde_json::to_vec_pretty(results)?;
        std::fs::write(&path, body).map_err(|e| io_err(&path, e))?;
        tracing::info!(path = %path.display(), runs = results.len(), "results written");
        Ok(path)
    }
}
