/// Identity and follow-graph lookups
///
/// Profiles and follower lists live in the identity service; this service only
/// reads them. Follower lists are eventually consistent with the feed: a new
/// follower does not receive posts fanned out before they followed.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserSummary>;

    async fn get_followers(&self, user_id: &str) -> Result<Vec<UserRef>>;
}

/// HTTP client for the identity service
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T>(&self, path: &str, what: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/api/v1/{}", self.base_url, path);
        debug!(url = %url, "Calling identity service");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("identity service: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(AppError::NotFound(what.to_string())),
            status if !status.is_success() => {
                return Err(AppError::Unavailable(format!(
                    "identity service returned {}",
                    status
                )))
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Internal(format!("identity service payload: {}", e)))
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityClient {
    async fn get_user_by_id(&self, user_id: &str) -> Result<UserSummary> {
        self.get_json(&format!("users/{}", user_id), &format!("user {}", user_id))
            .await
    }

    async fn get_followers(&self, user_id: &str) -> Result<Vec<UserRef>> {
        self.get_json(
            &format!("users/{}/followers", user_id),
            &format!("user {}", user_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpIdentityClient::new("http://identity:8080/", Duration::from_secs(2)).unwrap();
        assert_eq!(client.base_url, "http://identity:8080");
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = HttpIdentityClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = client.get_user_by_id("42").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
