use profilesync_common::{clamp_count, Network, ProfileSnapshot};
use serde_json::{Map, Value};

use super::{FetchFailure, FetchOutcome};

/// Twitter serves 48x48 avatars under a `_normal` suffix; `_400x400` is the
/// largest square variant of the same upload.
const TWITTER_LOW_RES: &str = "_normal";
const TWITTER_HIGH_RES: &str = "_400x400";

/// Upstream URL of the fetched image, kept next to `image` once that holds
/// a local path.
pub const PROFILE_IMAGE_URL: &str = "profile_image_url";

/// Keys outside the typed snapshot that adapters fill from upstream. A
/// refreshed entry takes these from the fresh fetch only.
pub const SOURCE_FIELDS: [&str; 3] = ["id", "account_type", PROFILE_IMAGE_URL];

/// Upstream profile fields before normalization. Adapters map their own
/// response types into this and nothing else.
#[derive(Debug, Clone, Default)]
pub struct RawProfile {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub posts: Option<i64>,
    pub image_url: Option<String>,
    /// Source fields (see [`SOURCE_FIELDS`]) the upstream returned.
    pub extra: Map<String, Value>,
}

/// The one normalization routine every adapter of every network goes through.
///
/// A profile without a username is a schema failure. Everything else that is
/// missing maps to empty strings and zero counts.
pub fn normalize_profile(network: Network, raw: RawProfile) -> FetchOutcome {
    let username = raw
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| FetchFailure::Upstream(format!("{network} response has no username")))?;

    let image_reference = raw
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .map(|u| upgrade_image_resolution(network, &u));

    let mut extra = raw.extra;
    if let Some(url) = &image_reference {
        extra.insert(PROFILE_IMAGE_URL.to_string(), Value::String(url.clone()));
    }

    Ok(ProfileSnapshot {
        username,
        display_name: raw.display_name.unwrap_or_default(),
        bio: raw.bio.unwrap_or_default(),
        follower_count: clamp_count(raw.followers),
        following_count: clamp_count(raw.following),
        post_count: clamp_count(raw.posts),
        image_reference,
        extra,
    })
}

/// Swap a known low-resolution image URL for its high-resolution sibling.
/// URLs that do not match the network's pattern pass through unchanged.
pub fn upgrade_image_resolution(network: Network, url: &str) -> String {
    match network {
        Network::Twitter => upgrade_twitter_avatar(url),
        Network::Instagram => url.to_string(),
    }
}

fn upgrade_twitter_avatar(url: &str) -> String {
    // Only the final path segment carries the size suffix.
    let name_start = url.rfind('/').map(|i| i + 1).unwrap_or(0);
    let (dir, file) = url.split_at(name_start);

    let (stem, ext) = match file.rfind('.') {
        Some(dot) => file.split_at(dot),
        None => (file, ""),
    };

    match stem.strip_suffix(TWITTER_LOW_RES) {
        Some(base) => format!("{dir}{base}{TWITTER_HIGH_RES}{ext}"),
        None => url.to_string(),
    }
}
