//! OAuth 2.0 authorization code flow with PKCE against X
//!
//! This covers building the authorization URL, exchanging the returned code
//! for tokens, and refreshing tokens once they expire.

use chrono::Utc;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, XApi},
    state::XOAuthConfig,
    store::CredentialRecord,
};

pub mod pkce;
pub mod session;
pub mod token;

pub use pkce::PkceChallenge;
pub use session::PendingLogin;
pub use token::{TokenGrant, TokenResponse};

/// Scopes requested for every user
pub const SCOPES: [&str; 4] = ["tweet.read", "users.read", "like.read", "offline.access"];

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Missing authorization code")]
    MissingCode,
    #[error("Missing PKCE code verifier")]
    MissingVerifier,
    #[error("No login in progress for this session, or it expired")]
    NoPendingLogin,
    #[error("OAuth state does not match the login in progress")]
    StateMismatch,
    #[error("Token response did not include a refresh token")]
    MissingRefreshToken,
    #[error("Token request failed: {status} - {body}")]
    Exchange { status: StatusCode, body: String },
    #[error("Token request network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to look up the authenticated user: {0}")]
    Profile(#[from] ApiError),
}

#[derive(Serialize)]
struct AuthUrlParams<'a> {
    response_type: &'static str,
    client_id: &'a str,
    redirect_uri: &'a str,
    scope: &'a str,
    state: &'a str,
    code_challenge: &'a str,
    code_challenge_method: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
enum TokenRequest<'a> {
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
        client_id: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
        client_id: &'a str,
    },
}

/// Talks to the X authorization server on behalf of the configured app
#[derive(Clone)]
pub struct OAuthFlow {
    config: XOAuthConfig,
    http: reqwest::Client,
    api: XApi,
}

impl OAuthFlow {
    pub fn new(config: XOAuthConfig, http: reqwest::Client, api: XApi) -> Self {
        Self { config, http, api }
    }

    fn token_url(&self) -> String {
        format!("{}/2/oauth2/token", self.api.base_url())
    }

    /// Start a login: returns the URL to send the user to, and the PKCE state
    /// that must be kept in their session until the callback
    pub fn begin_login(&self) -> color_eyre::Result<(String, PendingLogin)> {
        let pkce = PkceChallenge::generate();
        let state = pkce::generate_state();

        let url = self.authorization_url(&state, &pkce.challenge)?;
        Ok((url, PendingLogin::new(pkce.verifier, state)))
    }

    /// Build the authorization URL for a given state and code challenge
    pub fn authorization_url(&self, state: &str, code_challenge: &str) -> color_eyre::Result<String> {
        let scope = SCOPES.join(" ");
        let query = serde_urlencoded::to_string(AuthUrlParams {
            response_type: "code",
            client_id: &self.config.client_id,
            redirect_uri: &self.config.redirect_uri,
            scope: &scope,
            state,
            code_challenge,
            code_challenge_method: "S256",
        })?;

        Ok(format!("{}?{}", self.config.authorize_url, query))
    }

    /// Exchange the authorization code for tokens and look up who they belong to
    pub async fn complete_login(
        &self,
        code: Option<&str>,
        code_verifier: Option<&str>,
    ) -> Result<CredentialRecord, OAuthError> {
        let code = code.filter(|c| !c.is_empty()).ok_or(OAuthError::MissingCode)?;
        let code_verifier = code_verifier
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::MissingVerifier)?;

        let issued_at = Utc::now().timestamp_millis();
        let response = self
            .request_token(&TokenRequest::AuthorizationCode {
                code,
                redirect_uri: &self.config.redirect_uri,
                code_verifier,
                client_id: &self.config.client_id,
            })
            .await?;
        let refresh_token = response
            .refresh_token
            .ok_or(OAuthError::MissingRefreshToken)?;

        let user = self.api.me(&response.access_token).await?;
        info!("Authentication successful for X user {} (@{})", user.id, user.username);

        Ok(CredentialRecord {
            user_id: user.id,
            username: user.username,
            name: user.name,
            access_token: response.access_token,
            refresh_token,
            expires_in: response.expires_in,
            created_at: issued_at,
        })
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// Failures are logged and reported as `None` so callers can decide whether
    /// to skip the user or fail the request.
    pub async fn refresh(&self, refresh_token: &str) -> Option<TokenGrant> {
        let request = TokenRequest::RefreshToken {
            refresh_token,
            client_id: &self.config.client_id,
        };

        match self.request_token(&request).await {
            Ok(response) => Some(TokenGrant::from_refresh_response(response, refresh_token)),
            Err(err) => {
                warn!("Token refresh failed: {}", err);
                None
            }
        }
    }

    async fn request_token(&self, request: &TokenRequest<'_>) -> Result<TokenResponse, OAuthError> {
        let token_url = self.token_url();
        debug!("Token endpoint: {}", token_url);

        let response = self
            .http
            .post(&token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header("Accept", "application/json")
            .form(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            error!("Token request failed. Status: {}, Error: {}", status, body);
            return Err(OAuthError::Exchange { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}
