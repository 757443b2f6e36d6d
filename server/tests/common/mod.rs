#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use chrono::Utc;
use fixtures::x_api::{self, MockX};
use likewatch::{
    routes,
    state::{AppState, Config},
    store::{CredentialRecord, MemoryStore, TokenStore},
};
use tower::ServiceExt as _;

pub const FIXTURE_USER_ID: &str = "2244994945";

pub struct TestApp {
    pub mock: MockX,
    pub state: AppState,
}

impl TestApp {
    /// Start a mock X server and an app state that talks to it
    pub async fn start(records: Vec<CredentialRecord>) -> Self {
        Self::start_with(MockX::default(), Arc::new(MemoryStore::with_records(records)), &[]).await
    }

    pub async fn start_with(
        mock: MockX,
        store: Arc<dyn TokenStore>,
        extra_vars: &[(&str, &str)],
    ) -> Self {
        let base_url = fixtures::spawn_server(x_api::router(mock.clone()))
            .await
            .unwrap();

        let mut vars: HashMap<String, String> = HashMap::from([
            ("X_CLIENT_ID".to_string(), "test-client".to_string()),
            ("X_CLIENT_SECRET".to_string(), "test-secret".to_string()),
            (
                "X_REDIRECT_URI".to_string(),
                "http://localhost:3000/auth/callback".to_string(),
            ),
            (
                "SESSION_SECRET".to_string(),
                "integration-test-session-secret-0123456789".to_string(),
            ),
            ("X_API_BASE_URL".to_string(), base_url),
        ]);
        for (name, value) in extra_vars {
            vars.insert(name.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
        let state = AppState::new(config, store).unwrap();

        Self { mock, state }
    }

    pub fn router(&self) -> Router {
        routes::routes(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.get_with_cookie(uri, None).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }

        self.router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `name=value` part of the first Set-Cookie header
pub fn session_cookie(response: &Response<Body>) -> String {
    let header = response
        .headers()
        .get("set-cookie")
        .expect("login sets a cookie")
        .to_str()
        .unwrap();
    header.split(';').next().unwrap().to_string()
}

/// Pull one query parameter out of a URL
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let params: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
    params.into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A record whose access token is still valid for two hours
pub fn fresh_record(user_id: &str) -> CredentialRecord {
    CredentialRecord {
        user_id: user_id.to_string(),
        username: format!("user_{user_id}"),
        name: format!("User {user_id}"),
        access_token: format!("stored-access-{user_id}"),
        refresh_token: format!("stored-refresh-{user_id}"),
        expires_in: 7200,
        created_at: now_ms(),
    }
}

/// A record whose access token expired an hour ago
pub fn expired_record(user_id: &str) -> CredentialRecord {
    CredentialRecord {
        expires_in: 3600,
        created_at: now_ms() - 2 * 3600 * 1000,
        ..fresh_record(user_id)
    }
}

/// An expired record whose refresh token X will reject
pub fn revoked_record(user_id: &str) -> CredentialRecord {
    CredentialRecord {
        refresh_token: format!("revoked-refresh-{user_id}"),
        ..expired_record(user_id)
    }
}
