//! Mock of the X OAuth 2.0 token endpoint and the handful of v2 API endpoints likewatch consumes.
//!
//! Behaviour is driven by the values clients send:
//! - authorization codes starting with `bad` are rejected
//! - refresh tokens starting with `revoked` are rejected; issued ones refresh for their owner
//! - bearer tokens starting with `revoked` get a 401 from the API endpoints
//! - user ids registered with [`MockX::fail_likes_for`] get a 500 from the likes endpoint

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::info;

/// A user known to the mock platform
#[derive(Debug, Clone, Serialize)]
pub struct MockUser {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// A liked post as returned by `GET /2/users/:id/liked_tweets`
#[derive(Debug, Clone, Serialize)]
pub struct MockTweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author_id: String,
}

#[derive(Default)]
struct Inner {
    users: Vec<MockUser>,
    likes: HashMap<String, Vec<MockTweet>>,
    failing_like_users: HashSet<String>,
    issued_access_tokens: HashMap<String, String>,
    issued_refresh_tokens: HashMap<String, String>,
    token_counter: u64,
    expires_in: u64,
    code_exchanges: Vec<String>,
    refreshes: Vec<String>,
    like_requests: Vec<String>,
}

/// Shared, inspectable state of the mock platform
#[derive(Clone)]
pub struct MockX {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockX {
    fn default() -> Self {
        let mock = Self {
            inner: Arc::new(Mutex::new(Inner {
                expires_in: 7200,
                ..Default::default()
            })),
        };
        mock.add_user("2244994945", "fixture_user", "Fixture User");
        mock
    }
}

impl MockX {
    /// Register a user. Authorization codes equal to the username log in as that user.
    pub fn add_user(&self, id: &str, username: &str, name: &str) {
        let mut inner = self.lock();
        inner.users.push(MockUser {
            id: id.to_string(),
            username: username.to_string(),
            name: name.to_string(),
        });
    }

    /// Replace the liked posts returned for a user
    pub fn set_likes(&self, user_id: &str, likes: Vec<MockTweet>) {
        self.lock().likes.insert(user_id.to_string(), likes);
    }

    /// Make the likes endpoint answer 500 for this user
    pub fn fail_likes_for(&self, user_id: &str) {
        self.lock().failing_like_users.insert(user_id.to_string());
    }

    /// Lifetime in seconds given to newly issued access tokens
    pub fn set_expires_in(&self, expires_in: u64) {
        self.lock().expires_in = expires_in;
    }

    /// Authorization codes that were exchanged successfully, in order
    pub fn code_exchanges(&self) -> Vec<String> {
        self.lock().code_exchanges.clone()
    }

    /// Refresh tokens presented to the token endpoint, in order (accepted or not)
    pub fn refreshes(&self) -> Vec<String> {
        self.lock().refreshes.clone()
    }

    /// User ids whose liked posts were requested, in order
    pub fn like_requests(&self) -> Vec<String> {
        self.lock().like_requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another handler panicked; the data is still usable here
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn issue_tokens(inner: &mut Inner, user_id: &str) -> serde_json::Value {
        inner.token_counter += 1;
        let access_token = format!("access-{}", inner.token_counter);
        let refresh_token = format!("refresh-{}", inner.token_counter);
        inner
            .issued_access_tokens
            .insert(access_token.clone(), user_id.to_string());
        inner
            .issued_refresh_tokens
            .insert(refresh_token.clone(), user_id.to_string());

        json!({
            "token_type": "bearer",
            "expires_in": inner.expires_in,
            "access_token": access_token,
            "refresh_token": refresh_token,
            "scope": "tweet.read users.read like.read offline.access"
        })
    }
}

/// Build the mock X router
pub fn router(state: MockX) -> Router {
    Router::new()
        .route("/2/oauth2/token", post(token))
        .route("/2/users/me", get(users_me))
        .route("/2/users/:id/liked_tweets", get(liked_tweets))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    code: Option<String>,
    code_verifier: Option<String>,
    redirect_uri: Option<String>,
    refresh_token: Option<String>,
}

fn oauth_error(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_request",
            "error_description": description
        })),
    )
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

async fn token(
    State(state): State<MockX>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let has_basic_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h.starts_with("Basic "));
    if !has_basic_auth {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized_client" })),
        )
            .into_response();
    }

    let mut inner = state.lock();

    match form.grant_type.as_str() {
        "authorization_code" => {
            let Some(code) = form.code.filter(|c| !c.is_empty()) else {
                return oauth_error("Missing required parameter [code].");
            };
            if form.code_verifier.as_deref().unwrap_or_default().is_empty() {
                return oauth_error("Missing required parameter [code_verifier].");
            }
            if form.redirect_uri.as_deref().unwrap_or_default().is_empty() {
                return oauth_error("Missing required parameter [redirect_uri].");
            }
            if code.starts_with("bad") {
                return oauth_error("Value passed for the authorization code was invalid.");
            }

            let user_id = match inner.users.iter().find(|u| u.username == code) {
                Some(user) => user.id.clone(),
                None => match inner.users.first() {
                    Some(user) => user.id.clone(),
                    None => return oauth_error("No users configured."),
                },
            };

            info!("Mock X: exchanging code for user {}", user_id);
            inner.code_exchanges.push(code);
            Json(MockX::issue_tokens(&mut inner, &user_id)).into_response()
        }
        "refresh_token" => {
            let Some(refresh_token) = form.refresh_token.filter(|t| !t.is_empty()) else {
                return oauth_error("Missing required parameter [refresh_token].");
            };
            inner.refreshes.push(refresh_token.clone());

            if refresh_token.starts_with("revoked") {
                return oauth_error("Value passed for the token was invalid.");
            }

            // Tokens this mock never issued act for the first user
            let user_id = match inner.issued_refresh_tokens.get(&refresh_token) {
                Some(user_id) => user_id.clone(),
                None => inner
                    .users
                    .first()
                    .map(|u| u.id.clone())
                    .unwrap_or_default(),
            };
            Json(MockX::issue_tokens(&mut inner, &user_id)).into_response()
        }
        other => oauth_error(&format!("Unsupported grant_type {other}")),
    }
}

async fn users_me(State(state): State<MockX>, headers: HeaderMap) -> Response {
    let inner = state.lock();

    let user = bearer_token(&headers)
        .and_then(|token| inner.issued_access_tokens.get(token))
        .and_then(|user_id| inner.users.iter().find(|u| &u.id == user_id));

    match user {
        Some(user) => Json(json!({ "data": user })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "title": "Unauthorized", "status": 401 })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct LikedTweetsParams {
    max_results: Option<usize>,
    #[serde(rename = "tweet.fields")]
    tweet_fields: Option<String>,
}

async fn liked_tweets(
    State(state): State<MockX>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<LikedTweetsParams>,
) -> Response {
    let mut inner = state.lock();
    inner.like_requests.push(user_id.clone());

    match bearer_token(&headers) {
        Some(token) if !token.starts_with("revoked") => {}
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "title": "Unauthorized", "status": 401 })),
            )
                .into_response();
        }
    }

    if inner.failing_like_users.contains(&user_id) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "title": "Internal Error", "status": 500 })),
        )
            .into_response();
    }

    let include_fields = params
        .tweet_fields
        .as_deref()
        .is_some_and(|f| f.contains("created_at") && f.contains("author_id"));

    let likes = inner.likes.get(&user_id).cloned().unwrap_or_else(|| {
        (1..=3)
            .map(|n| MockTweet {
                id: format!("17000000000000000{n}"),
                text: format!("Fixture liked post {n}"),
                created_at: format!("2025-03-1{n}T12:00:00.000Z"),
                author_id: "783214".to_string(),
            })
            .collect()
    });
    let likes: Vec<_> = likes
        .into_iter()
        .take(params.max_results.unwrap_or(100))
        .collect();

    if likes.is_empty() {
        return Json(json!({ "meta": { "result_count": 0 } })).into_response();
    }

    let data: Vec<_> = likes
        .iter()
        .map(|t| {
            if include_fields {
                json!(t)
            } else {
                json!({ "id": t.id, "text": t.text })
            }
        })
        .collect();

    Json(json!({
        "data": data,
        "meta": { "result_count": data.len() }
    }))
    .into_response()
}
