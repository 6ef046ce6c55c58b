use std::sync::Arc;

use async_trait::async_trait;
use profilesync_common::Network;
use serde_json::{Map, Value};
use social_client::{InstagramClient, InstagramUser};
use tracing::warn;

use super::{normalize_profile, FetchOutcome, RawProfile, SourceAdapter};

/// Business/creator account lookup on the Facebook Graph API. One request
/// returns every field, so it is tried first.
pub struct InstagramBusinessAccount {
    client: Arc<InstagramClient>,
    user_id: String,
}

impl InstagramBusinessAccount {
    pub fn new(client: Arc<InstagramClient>, user_id: String) -> Self {
        Self { client, user_id }
    }
}

#[async_trait]
impl SourceAdapter for InstagramBusinessAccount {
    fn name(&self) -> &str {
        "instagram.business_account"
    }

    async fn fetch(&self) -> FetchOutcome {
        let user = self.client.business_account(&self.user_id).await?;
        normalize_profile(Network::Instagram, raw_from_user(user))
    }
}

/// `/me` on the Instagram Graph API, split over three requests because the
/// metric and picture fields are not granted to every token.
///
/// Basic fields and metrics are both required: a profile without follower
/// counts would overwrite the last known-good numbers with zeros. The picture
/// is optional; without it the image resolver falls back on its own.
pub struct InstagramGraphMe {
    client: Arc<InstagramClient>,
}

impl InstagramGraphMe {
    pub fn new(client: Arc<InstagramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for InstagramGraphMe {
    fn name(&self) -> &str {
        "instagram.graph_me"
    }

    async fn fetch(&self) -> FetchOutcome {
        let basic = self.client.me_basic().await?;
        let metrics = self.client.me_metrics().await?;

        let picture = match self.client.me_picture().await {
            Ok(picture) => picture,
            Err(e) => {
                warn!(error = %e, "Instagram profile picture unavailable");
                InstagramUser::default()
            }
        };

        let user = basic.merge(metrics).merge(picture);
        normalize_profile(Network::Instagram, raw_from_user(user))
    }
}

fn raw_from_user(user: InstagramUser) -> RawProfile {
    let mut extra = Map::new();
    if let Some(id) = user.id.filter(|id| !id.is_empty()) {
        extra.insert("id".to_string(), Value::String(id));
    }
    if let Some(account_type) = user.account_type.filter(|t| !t.is_empty()) {
        extra.insert("account_type".to_string(), Value::String(account_type));
    }

    RawProfile {
        username: user.username,
        display_name: user.name,
        bio: user.biography,
        followers: user.followers_count,
        following: user.follows_count,
        posts: user.media_count,
        image_url: user.profile_picture_url,
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_account_fields_map_onto_snapshot() {
        let user: InstagramUser = serde_json::from_str(
            r#"{
                "id": "17841400000000000",
                "username": "photos",
                "name": "Photo Person",
                "biography": "shots",
                "followers_count": 900,
                "follows_count": 120,
                "media_count": 40,
                "profile_picture_url": "https://scontent.cdninstagram.com/v/pic.jpg"
            }"#,
        )
        .unwrap();

        let profile = normalize_profile(Network::Instagram, raw_from_user(user)).unwrap();
        assert_eq!(profile.username, "photos");
        assert_eq!(profile.display_name, "Photo Person");
        assert_eq!(profile.bio, "shots");
        assert_eq!(profile.follower_count, 900);
        assert_eq!(profile.following_count, 120);
        assert_eq!(profile.post_count, 40);
        assert_eq!(
            profile.image_reference.as_deref(),
            Some("https://scontent.cdninstagram.com/v/pic.jpg")
        );
        assert_eq!(profile.extra["id"], "17841400000000000");
        assert_eq!(
            profile.extra["profile_image_url"],
            "https://scontent.cdninstagram.com/v/pic.jpg"
        );
    }

    #[test]
    fn graph_me_keeps_id_and_account_type() {
        let basic: InstagramUser = serde_json::from_str(
            r#"{"id": "42", "username": "photos", "media_count": 3, "account_type": "CREATOR"}"#,
        )
        .unwrap();
        let metrics: InstagramUser =
            serde_json::from_str(r#"{"followers_count": 10, "follows_count": 2}"#).unwrap();

        let profile =
            normalize_profile(Network::Instagram, raw_from_user(basic.merge(metrics))).unwrap();
        assert_eq!(profile.extra["id"], "42");
        assert_eq!(profile.extra["account_type"], "CREATOR");
        assert_eq!(profile.follower_count, 10);
        assert!(profile.extra.get("profile_image_url").is_none());
    }

    #[test]
    fn missing_username_fails_the_adapter() {
        let user: InstagramUser =
            serde_json::from_str(r#"{"followers_count": 900}"#).unwrap();
        assert!(normalize_profile(Network::Instagram, raw_from_user(user)).is_err());
    }
}
