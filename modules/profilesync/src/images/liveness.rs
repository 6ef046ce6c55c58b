use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use tracing::debug;

/// Reports whether an image reference can currently be fetched.
/// Implementations never fail: anything that goes wrong means "not live".
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn is_live(&self, reference: &str) -> bool;
}

/// What an image reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLocation<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

/// `http`/`https` URLs are remote; everything else is a filesystem path.
pub fn locate(reference: &str) -> ImageLocation<'_> {
    match url::Url::parse(reference) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => ImageLocation::Remote(reference),
        _ => ImageLocation::Local(Path::new(reference)),
    }
}

/// Probes remote images with `HEAD` and local images with a read-open.
pub struct HttpImageProbe {
    client: reqwest::Client,
}

impl HttpImageProbe {
    /// `client` should carry the run's short request timeout.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn probe_remote(&self, url: &str) -> bool {
        let resp = match self.client.head(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(url, error = %e, "Image probe failed");
                return false;
            }
        };

        // Some CDNs refuse HEAD. A one-byte ranged GET is the next lightest
        // thing; the body is never read.
        let resp = if resp.status() == StatusCode::METHOD_NOT_ALLOWED {
            match self.client.get(url).header(RANGE, "bytes=0-0").send().await {
                Ok(resp) => resp,
                Err(e) => {
                    debug!(url, error = %e, "Ranged image probe failed");
                    return false;
                }
            }
        } else {
            resp
        };

        let live = is_live_response(resp.status(), resp.headers().get(CONTENT_TYPE));
        debug!(url, status = resp.status().as_u16(), live, "Probed remote image");
        live
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn is_live(&self, reference: &str) -> bool {
        match locate(reference) {
            ImageLocation::Remote(url) => self.probe_remote(url).await,
            ImageLocation::Local(path) => local_image_is_readable(path).await,
        }
    }
}

/// A 2xx answer with an `image/*` content type.
pub fn is_live_response(status: StatusCode, content_type: Option<&HeaderValue>) -> bool {
    status.is_success()
        && content_type
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
}

/// Live iff the path is a regular file we can open for reading.
pub async fn local_image_is_readable(path: &Path) -> bool {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    let live = is_file && tokio::fs::File::open(path).await.is_ok();
    debug!(path = %path.display(), live, "Probed local image");
    live
}
