use crate::types::InstagramUser;
use crate::{send_json, Result};

/// Instagram Graph API (Instagram Login). Serves `/me`.
const INSTAGRAM_GRAPH_URL: &str = "https://graph.instagram.com";

/// Facebook Graph API. Serves Instagram business/creator accounts by id.
const FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com/v19.0";

const BUSINESS_FIELDS: &str =
    "username,name,biography,followers_count,follows_count,media_count,profile_picture_url";
const ME_BASIC_FIELDS: &str = "id,username,name,media_count,account_type";
const ME_METRIC_FIELDS: &str = "followers_count,follows_count,biography";
const ME_PICTURE_FIELDS: &str = "profile_picture_url";

/// Access-token client for the two Instagram profile surfaces.
pub struct InstagramClient {
    client: reqwest::Client,
    instagram_graph_url: String,
    facebook_graph_url: String,
    access_token: String,
}

impl InstagramClient {
    pub fn new(client: reqwest::Client, access_token: String) -> Self {
        Self {
            client,
            instagram_graph_url: INSTAGRAM_GRAPH_URL.to_string(),
            facebook_graph_url: FACEBOOK_GRAPH_URL.to_string(),
            access_token,
        }
    }

    /// Point both Graph surfaces at one base URL (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        self.instagram_graph_url = base.clone();
        self.facebook_graph_url = base;
        self
    }

    /// `GET /{ig-user-id}` on the Facebook Graph API. One request, all fields.
    pub async fn business_account(&self, user_id: &str) -> Result<InstagramUser> {
        tracing::debug!(user_id, "Fetching Instagram business account");
        let url = format!("{}/{}", self.facebook_graph_url, user_id);
        self.fields(&url, BUSINESS_FIELDS).await
    }

    /// `GET /me?fields=id,username,name,media_count,account_type`
    pub async fn me_basic(&self) -> Result<InstagramUser> {
        self.me(ME_BASIC_FIELDS).await
    }

    /// `GET /me?fields=followers_count,follows_count,biography`
    pub async fn me_metrics(&self) -> Result<InstagramUser> {
        self.me(ME_METRIC_FIELDS).await
    }

    /// `GET /me?fields=profile_picture_url`
    pub async fn me_picture(&self) -> Result<InstagramUser> {
        self.me(ME_PICTURE_FIELDS).await
    }

    async fn me(&self, fields: &str) -> Result<InstagramUser> {
        tracing::debug!(fields, "Fetching Instagram /me");
        let url = format!("{}/me", self.instagram_graph_url);
        self.fields(&url, fields).await
    }

    async fn fields(&self, url: &str, fields: &str) -> Result<InstagramUser> {
        let request = self.client.get(url).query(&[
            ("fields", fields),
            ("access_token", self.access_token.as_str()),
        ]);
        send_json(request).await
    }
}
