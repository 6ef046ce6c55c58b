use serde::Deserialize;

// --- Twitter API v2 ---

/// Envelope for Twitter v2 lookups. A missing user comes back as 200 with
/// `errors` set and no `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<TwitterProblem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterProblem {
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl TwitterProblem {
    pub fn describe(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(t), Some(d)) => format!("{t}: {d}"),
            (Some(t), None) => t.clone(),
            (None, Some(d)) => d.clone(),
            (None, None) => "unknown problem".to_string(),
        }
    }
}

/// A user object from `/2/users/:id` or `/2/users/by/username/:username`.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterUser {
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicMetrics {
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub tweet_count: Option<i64>,
    pub listed_count: Option<i64>,
}

// --- Twitter API v1.1 ---

/// A user object from `/1.1/users/show.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyTwitterUser {
    pub id_str: Option<String>,
    pub screen_name: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub followers_count: Option<i64>,
    /// v1.1 calls accounts you follow "friends".
    pub friends_count: Option<i64>,
    pub statuses_count: Option<i64>,
    pub profile_image_url_https: Option<String>,
    pub profile_image_url: Option<String>,
}

impl LegacyTwitterUser {
    /// Prefer the https variant; the plain one is kept for old payloads.
    pub fn image_url(&self) -> Option<&str> {
        self.profile_image_url_https
            .as_deref()
            .or(self.profile_image_url.as_deref())
    }
}

// --- Instagram Graph APIs ---

/// Instagram user fields. Every Graph endpoint only returns the fields that
/// were requested, so every field is optional and one struct covers the
/// business-account lookup as well as the split `/me` requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstagramUser {
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub biography: Option<String>,
    pub followers_count: Option<i64>,
    pub follows_count: Option<i64>,
    pub media_count: Option<i64>,
    pub account_type: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl InstagramUser {
    /// Fill fields missing here from `other`. Used to combine the split
    /// `/me` responses into one user.
    pub fn merge(mut self, other: InstagramUser) -> Self {
        self.id = self.id.or(other.id);
        self.username = self.username.or(other.username);
        self.name = self.name.or(other.name);
        self.biography = self.biography.or(other.biography);
        self.followers_count = self.followers_count.or(other.followers_count);
        self.follows_count = self.follows_count.or(other.follows_count);
        self.media_count = self.media_count.or(other.media_count);
        self.account_type = self.account_type.or(other.account_type);
        self.profile_picture_url = self.profile_picture_url.or(other.profile_picture_url);
        self
    }
}
