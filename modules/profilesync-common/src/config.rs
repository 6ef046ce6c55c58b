use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ProfileSyncError, Result};

const DEFAULT_OUTPUT_PATH: &str = "social_data.json";
const DEFAULT_IMAGE_DIR: &str = "img";
const DEFAULT_FALLBACK_IMAGE: &str = "img/default_profile.png";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Run configuration, read once at startup and handed to the reconciler.
/// Credentials are all optional: a network without them is simply carried
/// forward from the last snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    // Twitter
    pub twitter_user_id: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub twitter_username: Option<String>,

    // Instagram
    pub instagram_access_token: Option<String>,
    pub instagram_user_id: Option<String>,

    // Output
    pub output_path: PathBuf,
    pub save_profile_images: bool,
    pub image_dir: PathBuf,
    pub fallback_image: String,

    // Network
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twitter_user_id: None,
            twitter_bearer_token: None,
            twitter_username: None,
            instagram_access_token: None,
            instagram_user_id: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            save_profile_images: true,
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            fallback_image: DEFAULT_FALLBACK_IMAGE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let save_profile_images = match get("SAVE_PROFILE_IMAGES") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ProfileSyncError::Config(format!("SAVE_PROFILE_IMAGES must be a boolean, got {raw:?}"))
            })?,
            None => defaults.save_profile_images,
        };

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ProfileSyncError::Config(format!(
                        "REQUEST_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => defaults.request_timeout,
        };

        Ok(Self {
            twitter_user_id: get("TWITTER_USER_ID"),
            twitter_bearer_token: get("TWITTER_BEARER_TOKEN"),
            twitter_username: get("TWITTER_USERNAME").map(|u| u.trim_start_matches('@').to_string()),
            instagram_access_token: get("INSTAGRAM_ACCESS_TOKEN"),
            instagram_user_id: get("INSTAGRAM_USER_ID"),
            output_path: get("OUTPUT_PATH").map(PathBuf::from).unwrap_or(defaults.output_path),
            save_profile_images,
            image_dir: get("IMAGE_DIR").map(PathBuf::from).unwrap_or(defaults.image_dir),
            fallback_image: get("FALLBACK_IMAGE").unwrap_or(defaults.fallback_image),
            request_timeout,
        })
    }

    /// Log which settings are present without leaking secrets.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let n: usize = val.chars().take(5).map(char::len_utf8).sum();
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => preview(v),
                None => "<not set>".to_string(),
            }
        }
        fn plain_opt(val: &Option<String>) -> &str {
            val.as_deref().unwrap_or("<not set>")
        }

        tracing::info!("Config loaded:");
        tracing::info!("  TWITTER_USER_ID: {}", plain_opt(&self.twitter_user_id));
        tracing::info!("  TWITTER_USERNAME: {}", plain_opt(&self.twitter_username));
        tracing::info!("  TWITTER_BEARER_TOKEN: {}", preview_opt(&self.twitter_bearer_token));
        tracing::info!("  INSTAGRAM_USER_ID: {}", plain_opt(&self.instagram_user_id));
        tracing::info!("  INSTAGRAM_ACCESS_TOKEN: {}", preview_opt(&self.instagram_access_token));
        tracing::info!("  OUTPUT_PATH: {}", self.output_path.display());
        tracing::info!("  SAVE_PROFILE_IMAGES: {}", self.save_profile_images);
        tracing::info!("  IMAGE_DIR: {}", self.image_dir.display());
        tracing::info!("  FALLBACK_IMAGE: {}", self.fallback_image);
        tracing::info!("  REQUEST_TIMEOUT_SECS: {}", self.request_timeout.as_secs());
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
