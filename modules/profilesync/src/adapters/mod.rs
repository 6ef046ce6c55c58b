// Source adapters: one upstream query strategy each.
//
// Every adapter binds its identity and credentials at construction and
// turns whatever comes back into a fully normalized ProfileSnapshot through
// the shared routine in `normalize`. Network and schema errors never escape
// as panics or foreign error types; they become FetchFailure.

pub mod instagram;
pub mod normalize;
pub mod twitter;

use async_trait::async_trait;
use profilesync_common::ProfileSnapshot;
use social_client::SocialApiError;

pub use normalize::{normalize_profile, upgrade_image_resolution, RawProfile, SOURCE_FIELDS};

/// Why an adapter produced no data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    /// HTTP error, timeout, or a body that is not the documented shape.
    #[error("upstream unavailable: {0}")]
    Upstream(String),
}

impl From<SocialApiError> for FetchFailure {
    fn from(err: SocialApiError) -> Self {
        FetchFailure::Upstream(err.to_string())
    }
}

/// Either a fully normalized snapshot or the reason there is none.
pub type FetchOutcome = Result<ProfileSnapshot, FetchFailure>;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable name for logs and run reports, e.g. `twitter.v2.by_id`.
    fn name(&self) -> &str;

    async fn fetch(&self) -> FetchOutcome;
}
