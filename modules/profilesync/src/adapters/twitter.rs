use std::sync::Arc;

use async_trait::async_trait;
use profilesync_common::Network;
use social_client::{LegacyTwitterUser, TwitterClient, TwitterUser};

use super::{normalize_profile, FetchOutcome, RawProfile, SourceAdapter};

/// `GET /2/users/:id`. Tried first; ids survive handle renames.
pub struct TwitterById {
    client: Arc<TwitterClient>,
    user_id: String,
}

impl TwitterById {
    pub fn new(client: Arc<TwitterClient>, user_id: String) -> Self {
        Self { client, user_id }
    }
}

#[async_trait]
impl SourceAdapter for TwitterById {
    fn name(&self) -> &str {
        "twitter.v2.by_id"
    }

    async fn fetch(&self) -> FetchOutcome {
        let user = self.client.user_by_id(&self.user_id).await?;
        normalize_profile(Network::Twitter, raw_from_v2(user))
    }
}

/// `GET /2/users/by/username/:username`
pub struct TwitterByUsername {
    client: Arc<TwitterClient>,
    username: String,
}

impl TwitterByUsername {
    pub fn new(client: Arc<TwitterClient>, username: String) -> Self {
        Self { client, username }
    }
}

#[async_trait]
impl SourceAdapter for TwitterByUsername {
    fn name(&self) -> &str {
        "twitter.v2.by_username"
    }

    async fn fetch(&self) -> FetchOutcome {
        let user = self.client.user_by_username(&self.username).await?;
        normalize_profile(Network::Twitter, raw_from_v2(user))
    }
}

/// `GET /1.1/users/show.json`. Last resort for apps still on v1.1 access.
pub struct TwitterLegacyShow {
    client: Arc<TwitterClient>,
    username: Option<String>,
    user_id: Option<String>,
}

impl TwitterLegacyShow {
    pub fn new(client: Arc<TwitterClient>, username: Option<String>, user_id: Option<String>) -> Self {
        Self {
            client,
            username,
            user_id,
        }
    }
}

#[async_trait]
impl SourceAdapter for TwitterLegacyShow {
    fn name(&self) -> &str {
        "twitter.v1.users_show"
    }

    async fn fetch(&self) -> FetchOutcome {
        let user = self
            .client
            .legacy_user_show(self.username.as_deref(), self.user_id.as_deref())
            .await?;
        normalize_profile(Network::Twitter, raw_from_legacy(user))
    }
}

fn raw_from_v2(user: TwitterUser) -> RawProfile {
    let metrics = user.public_metrics.unwrap_or_default();
    RawProfile {
        username: user.username,
        display_name: user.name,
        bio: user.description,
        followers: metrics.followers_count,
        following: metrics.following_count,
        posts: metrics.tweet_count,
        image_url: user.profile_image_url,
        extra: Default::default(),
    }
}

fn raw_from_legacy(user: LegacyTwitterUser) -> RawProfile {
    let image_url = user.image_url().map(str::to_string);
    RawProfile {
        username: user.screen_name,
        display_name: user.name,
        bio: user.description,
        followers: user.followers_count,
        following: user.friends_count,
        posts: user.statuses_count,
        image_url,
        extra: Default::default(),
    }
}
