use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sha2::{Digest, Sha512};
use tower_cookies::Key;

use crate::{
    api::XApi,
    oauth::OAuthFlow,
    store::{Credentials, TokenStore},
};

/// Shortest accepted `SESSION_SECRET`, in bytes
const MIN_SESSION_SECRET_LEN: usize = 32;

/// Timeout applied to every request made to X
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// OAuth client registration for the X app
#[derive(Clone)]
pub struct XOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
}

impl std::fmt::Debug for XOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("authorize_url", &self.authorize_url)
            .finish()
    }
}

/// Everything read from the environment at startup
#[derive(Clone)]
pub struct Config {
    pub x_oauth: XOAuthConfig,
    pub api_base_url: String,
    pub session_secret: String,
    pub cors_origins: Vec<HeaderValue>,
    pub port: u16,
    pub token_file: String,
    pub poll_interval: Duration,
    pub post_login_redirect: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let x_oauth = XOAuthConfig {
            client_id: require("X_CLIENT_ID")?,
            client_secret: require("X_CLIENT_SECRET")?,
            redirect_uri: require("X_REDIRECT_URI")?,
            authorize_url: get("X_AUTHORIZE_URL")
                .unwrap_or_else(|| "https://x.com/i/oauth2/authorize".to_string()),
        };

        let session_secret = require("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            });
        }

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    reason: format!("{origin:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let port = match get("PORT") {
            Some(port) => port.parse().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => 3000,
        };

        let poll_interval_secs: u64 = match get("POLL_INTERVAL_SECS") {
            Some(secs) => secs.parse().map_err(|e| ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                reason: format!("{e}"),
            })?,
            None => 20 * 60,
        };
        if poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            x_oauth,
            api_base_url: get("X_API_BASE_URL").unwrap_or_else(|| "https://api.x.com".to_string()),
            session_secret,
            cors_origins,
            port,
            token_file: get("TOKEN_FILE").unwrap_or_else(|| "tokens.json".to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            post_login_redirect: get("POST_LOGIN_REDIRECT"),
        })
    }

    /// Key for the encrypted session cookies, stretched from `SESSION_SECRET`
    pub fn cookie_key(&self) -> Key {
        let digest = Sha512::digest(self.session_secret.as_bytes());
        Key::from(digest.as_slice())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cookie_key: Key,
    pub credentials: Credentials,
    pub oauth: OAuthFlow,
    pub x_api: XApi,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> color_eyre::Result<Self> {
        let http = reqwest::ClientBuilder::new()
            .timeout(HTTP_TIMEOUT)
            .use_rustls_tls()
            .build()?;

        let x_api = XApi::new(http.clone(), config.api_base_url.clone());
        let oauth = OAuthFlow::new(config.x_oauth.clone(), http, x_api.clone());

        Ok(Self {
            cookie_key: config.cookie_key(),
            config: Arc::new(config),
            credentials: Credentials::new(store),
            oauth,
            x_api,
        })
    }
}
