use std::fmt;

use tracing::{debug, info};

use super::liveness::ImageProbe;

/// Final image reference plus the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChoice {
    /// The previously persisted image is still live.
    Prior(String),
    /// The just-fetched image, trusted without a probe.
    Fresh(String),
    /// Neither was usable; the static asset.
    Fallback(String),
}

impl ImageChoice {
    pub fn reference(&self) -> &str {
        match self {
            ImageChoice::Prior(r) | ImageChoice::Fresh(r) | ImageChoice::Fallback(r) => r,
        }
    }

    pub fn into_reference(self) -> String {
        match self {
            ImageChoice::Prior(r) | ImageChoice::Fresh(r) | ImageChoice::Fallback(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageChoice::Prior(_) => "prior",
            ImageChoice::Fresh(_) => "fresh",
            ImageChoice::Fallback(_) => "fallback",
        }
    }
}

impl fmt::Display for ImageChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reference(), self.kind())
    }
}

fn non_empty(reference: Option<&str>) -> Option<&str> {
    reference.map(str::trim).filter(|r| !r.is_empty())
}

/// Pick the image to persist for one network.
///
/// A prior image that still resolves is kept even when a new one was fetched,
/// and that includes a previously persisted fallback. Only the prior
/// reference is probed; a fresh one is taken as-is.
pub async fn resolve_image(
    probe: &dyn ImageProbe,
    prior: Option<&str>,
    fresh: Option<&str>,
    fallback: &str,
) -> ImageChoice {
    if let Some(prior) = non_empty(prior) {
        if probe.is_live(prior).await {
            if prior == fallback.trim() {
                info!(
                    prior,
                    fresh = non_empty(fresh).unwrap_or(""),
                    "Prior image is the fallback and still live, keeping it"
                );
            } else {
                debug!(prior, "Keeping prior image");
            }
            return ImageChoice::Prior(prior.to_string());
        }
        debug!(prior, "Prior image is not live");
    }

    if let Some(fresh) = non_empty(fresh) {
        return ImageChoice::Fresh(fresh.to_string());
    }

    ImageChoice::Fallback(fallback.to_string())
}
