use crate::types::{LegacyTwitterUser, TwitterResponse, TwitterUser};
use crate::{send_json, Result, SocialApiError};

const BASE_URL: &str = "https://api.twitter.com";

/// Fields requested on every v2 user lookup.
const USER_FIELDS: &str = "description,name,username,profile_image_url,public_metrics";

/// Bearer-token client for the Twitter user lookup endpoints.
pub struct TwitterClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl TwitterClient {
    /// The `reqwest::Client` is shared with the caller so timeouts and the
    /// connection pool are configured in one place.
    pub fn new(client: reqwest::Client, bearer_token: String) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            bearer_token,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// `GET /2/users/:id`
    pub async fn user_by_id(&self, user_id: &str) -> Result<TwitterUser> {
        tracing::debug!(user_id, "Looking up Twitter user by id");
        let url = format!("{}/2/users/{}", self.base_url, user_id);
        self.v2_lookup(&url).await
    }

    /// `GET /2/users/by/username/:username`
    pub async fn user_by_username(&self, username: &str) -> Result<TwitterUser> {
        tracing::debug!(username, "Looking up Twitter user by username");
        let url = format!("{}/2/users/by/username/{}", self.base_url, username);
        self.v2_lookup(&url).await
    }

    /// `GET /1.1/users/show.json`, keyed by screen name when one is given,
    /// otherwise by numeric id.
    pub async fn legacy_user_show(
        &self,
        screen_name: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<LegacyTwitterUser> {
        let query = match (screen_name, user_id) {
            (Some(name), _) => [("screen_name", name)],
            (None, Some(id)) => [("user_id", id)],
            (None, None) => return Err(SocialApiError::MissingField("screen_name or user_id")),
        };

        tracing::debug!(?query, "Looking up Twitter user via v1.1");
        let url = format!("{}/1.1/users/show.json", self.base_url);
        let request = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&query);

        send_json(request).await
    }

    async fn v2_lookup(&self, url: &str) -> Result<TwitterUser> {
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(&[("user.fields", USER_FIELDS)]);

        let resp: TwitterResponse<TwitterUser> = send_json(request).await?;
        match resp.data {
            Some(user) => Ok(user),
            None => match resp.errors.first() {
                Some(problem) => Err(SocialApiError::Api {
                    status: 200,
                    message: problem.describe(),
                }),
                None => Err(SocialApiError::MissingField("data")),
            },
        }
    }
}
