use std::sync::Arc;

use profilesync_common::{Config, Network, ProfileSnapshot};
use social_client::{InstagramClient, TwitterClient};
use tracing::{info, warn};

use crate::adapters::instagram::{InstagramBusinessAccount, InstagramGraphMe};
use crate::adapters::twitter::{TwitterById, TwitterByUsername, TwitterLegacyShow};
use crate::adapters::{FetchFailure, SourceAdapter};

/// Result of running one network's cascade.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOutcome {
    /// An adapter returned data. Zero followers is still data.
    Fetched {
        adapter: String,
        profile: ProfileSnapshot,
    },
    /// Every adapter failed, or none was configured. `attempts` is in the
    /// order tried.
    Unavailable {
        attempts: Vec<(String, FetchFailure)>,
    },
}

impl CascadeOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, CascadeOutcome::Fetched { .. })
    }
}

/// Ordered fallback sequence of adapters for one network.
pub struct Cascade {
    network: Network,
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl Cascade {
    pub fn new(network: Network, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { network, adapters }
    }

    /// Build the production cascade for `network` from whatever credentials
    /// are configured. Adapters whose identifiers are missing are left out;
    /// with no credentials at all the cascade is empty.
    pub fn from_config(network: Network, config: &Config, http: &reqwest::Client) -> Self {
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

        match network {
            Network::Twitter => {
                if let Some(token) = &config.twitter_bearer_token {
                    let client = Arc::new(TwitterClient::new(http.clone(), token.clone()));
                    if let Some(id) = &config.twitter_user_id {
                        adapters.push(Box::new(TwitterById::new(client.clone(), id.clone())));
                    }
                    if let Some(username) = &config.twitter_username {
                        adapters.push(Box::new(TwitterByUsername::new(
                            client.clone(),
                            username.clone(),
                        )));
                    }
                    if config.twitter_username.is_some() || config.twitter_user_id.is_some() {
                        adapters.push(Box::new(TwitterLegacyShow::new(
                            client,
                            config.twitter_username.clone(),
                            config.twitter_user_id.clone(),
                        )));
                    }
                }
            }
            Network::Instagram => {
                if let Some(token) = &config.instagram_access_token {
                    let client = Arc::new(InstagramClient::new(http.clone(), token.clone()));
                    if let Some(id) = &config.instagram_user_id {
                        adapters.push(Box::new(InstagramBusinessAccount::new(
                            client.clone(),
                            id.clone(),
                        )));
                    }
                    adapters.push(Box::new(InstagramGraphMe::new(client)));
                }
            }
        }

        Self::new(network, adapters)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Try each adapter in order and stop at the first success.
    pub async fn run(&self) -> CascadeOutcome {
        let network = self.network;
        if self.adapters.is_empty() {
            warn!(%network, "No credentials configured, skipping fetch");
            return CascadeOutcome::Unavailable { attempts: Vec::new() };
        }

        let mut attempts = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let name = adapter.name();
            match adapter.fetch().await {
                Ok(profile) => {
                    info!(
                        %network,
                        adapter = name,
                        username = profile.username.as_str(),
                        followers = profile.follower_count,
                        "Profile fetched"
                    );
                    return CascadeOutcome::Fetched {
                        adapter: name.to_string(),
                        profile,
                    };
                }
                Err(failure) => {
                    warn!(%network, adapter = name, error = %failure, "Adapter failed, trying next");
                    attempts.push((name.to_string(), failure));
                }
            }
        }

        warn!(%network, attempts = attempts.len(), "All adapters failed");
        CascadeOutcome::Unavailable { attempts }
    }
}
