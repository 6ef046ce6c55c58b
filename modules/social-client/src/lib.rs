pub mod error;
pub mod instagram;
pub mod twitter;
pub mod types;

pub use error::{Result, SocialApiError};
pub use instagram::InstagramClient;
pub use twitter::TwitterClient;
pub use types::{
    InstagramUser, LegacyTwitterUser, PublicMetrics, TwitterProblem, TwitterResponse, TwitterUser,
};

use serde::de::DeserializeOwned;

/// Send a prepared GET and decode the JSON body. Non-2xx statuses become
/// `SocialApiError::Api` carrying the response text.
pub(crate) async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
    let resp = request.send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SocialApiError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}
