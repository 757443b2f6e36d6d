//! Client for the X v2 endpoints read by likewatch

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many liked posts are requested per call
pub const LIKES_PAGE_SIZE: u8 = 10;

/// Fields requested for each liked post
const TWEET_FIELDS: &str = "created_at,author_id";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The platform rejected the access token
    #[error("X API rejected the access token")]
    Unauthorized,
    #[error("X API request failed: {status} - {body}")]
    Status { status: StatusCode, body: String },
    #[error("X API network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The authenticated user, from `GET /2/users/me`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XUser {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// A post the user liked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedPost {
    pub id: String,
    pub text: String,
    pub created_at: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

/// Thin wrapper over the X REST API
#[derive(Clone)]
pub struct XApi {
    http: reqwest::Client,
    base_url: String,
}

impl XApi {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up the user the access token belongs to
    pub async fn me(&self, access_token: &str) -> Result<XUser, ApiError> {
        let url = format!("{}/2/users/me", self.base_url);
        let response = self.http.get(&url).bearer_auth(access_token).send().await?;

        let envelope: DataEnvelope<XUser> = Self::check(response).await?.json().await?;
        envelope.data.ok_or_else(|| ApiError::Status {
            status: StatusCode::OK,
            body: "users/me response had no data".to_string(),
        })
    }

    /// Fetch the most recent posts the user liked, newest first
    pub async fn liked_posts(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<LikedPost>, ApiError> {
        let url = format!("{}/2/users/{}/liked_tweets", self.base_url, user_id);
        let max_results = LIKES_PAGE_SIZE.to_string();

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("max_results", max_results.as_str()),
                ("tweet.fields", TWEET_FIELDS),
            ])
            .send()
            .await?;

        // `data` is omitted entirely when the user has no likes
        let envelope: DataEnvelope<Vec<LikedPost>> = Self::check(response).await?.json().await?;
        let likes = envelope.data.unwrap_or_default();
        debug!("Fetched {} liked posts for user {}", likes.len(), user_id);

        Ok(likes)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        Err(ApiError::Status { status, body })
    }
}
