use serde::Deserialize;

/// Body of a successful response from the X token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub access_token: String,
    /// Only present when `offline.access` was granted
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Fresh token pair produced by a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl TokenGrant {
    /// Build a grant from a refresh response, keeping `previous_refresh_token`
    /// when the platform did not rotate it
    pub fn from_refresh_response(response: TokenResponse, previous_refresh_token: &str) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| previous_refresh_token.to_string()),
            expires_in: response.expires_in,
        }
    }
}
