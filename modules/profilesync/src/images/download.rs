use std::path::{Path, PathBuf};

use async_trait::async_trait;
use profilesync_common::{Network, ProfileSyncError, Result};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Stores a chosen remote image locally and returns where it landed.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, network: Network, url: &str) -> Result<PathBuf>;
}

/// Streams images into `<image_dir>/<network file name>`.
pub struct HttpImageDownloader {
    client: reqwest::Client,
    image_dir: PathBuf,
}

impl HttpImageDownloader {
    pub fn new(client: reqwest::Client, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            image_dir: image_dir.into(),
        }
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<()> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProfileSyncError::ImageDownload(format!("{url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProfileSyncError::ImageDownload(format!(
                "{url}: status {}",
                status.as_u16()
            )));
        }

        let io_err = |e: std::io::Error| {
            ProfileSyncError::ImageDownload(format!("{}: {e}", partial.display()))
        };
        let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ProfileSyncError::ImageDownload(format!("{url}: {e}")))?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
        }
        file.sync_all().await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl ImageDownloader for HttpImageDownloader {
    async fn download(&self, network: Network, url: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.image_dir).await.map_err(|e| {
            ProfileSyncError::ImageDownload(format!("{}: {e}", self.image_dir.display()))
        })?;

        let target = self.image_dir.join(network.image_file_name());
        let partial = target.with_extension("part");

        if let Err(e) = self.stream_to(url, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(ProfileSyncError::ImageDownload(format!(
                "{}: {e}",
                target.display()
            )));
        }

        info!(%network, path = %target.display(), "Downloaded profile image");
        Ok(target)
    }
}
