use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse as _, Response},
};
use tower_cookies::cookie::SameSite;
use tracing::{debug, error, warn};

pub use tower_cookies::Cookie;

use crate::{
    oauth::{session::PENDING_LOGIN_TTL_SECS, PendingLogin},
    state::AppState,
};

/// Cookie name for the PKCE state of a login in progress
pub const PENDING_LOGIN_COOKIE: &str = "likewatch_login";

/// Encrypted cookies for the current request
pub struct SessionCookies {
    cookies: tower_cookies::Cookies,
    state: AppState,
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for SessionCookies {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = match tower_cookies::Cookies::from_request_parts(parts, state).await {
            Ok(cookies) => cookies,
            Err(_) => {
                error!("Failed to extract cookies from request");
                return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
            }
        };

        Ok(SessionCookies {
            cookies,
            state: state.clone(),
        })
    }
}

impl SessionCookies {
    /// Add a new private cookie
    pub fn add(&self, cookie: Cookie<'static>) {
        let private = self.cookies.private(&self.state.cookie_key);
        private.add(cookie);
    }

    /// Get a private cookie by name
    pub fn get(&self, name: &str) -> Option<Cookie<'static>> {
        let private = self.cookies.private(&self.state.cookie_key);
        private.get(name)
    }

    /// Removes the `cookie` from the jar.
    pub fn remove(&self, cookie: Cookie<'static>) {
        let private = self.cookies.private(&self.state.cookie_key);
        private.remove(cookie);
    }

    /// Remember the PKCE state for the login that is being started
    pub fn set_pending_login(&self, login: &PendingLogin) -> color_eyre::Result<()> {
        let value = serde_json::to_string(login)?;
        let secure = self.state.config.x_oauth.redirect_uri.starts_with("https://");

        // Lax so the cookie survives the top-level redirect back from X
        let cookie = Cookie::build((PENDING_LOGIN_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(time::Duration::seconds(PENDING_LOGIN_TTL_SECS))
            .build();
        self.add(cookie);

        Ok(())
    }

    /// The login in progress for this session, if it exists and has not expired
    pub fn pending_login(&self) -> Option<PendingLogin> {
        let cookie = self.get(PENDING_LOGIN_COOKIE)?;

        let login: PendingLogin = match serde_json::from_str(cookie.value()) {
            Ok(login) => login,
            Err(err) => {
                warn!("Ignoring malformed login cookie: {}", err);
                return None;
            }
        };

        if login.is_expired() {
            debug!("Login cookie expired");
            return None;
        }

        Some(login)
    }

    pub fn clear_pending_login(&self) {
        self.remove(Cookie::build((PENDING_LOGIN_COOKIE, "")).path("/").build());
    }
}
