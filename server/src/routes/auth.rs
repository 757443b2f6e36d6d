use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    cookies::SessionCookies,
    errors::{ServerError, ServerResult, WithStatus as _},
    oauth::OAuthError,
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub auth_url: String,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub user_id: String,
    pub username: String,
}

/// Map an OAuth failure to the status reported to the browser
fn reject(err: OAuthError) -> ServerError<StatusCode> {
    let status = match &err {
        OAuthError::MissingCode
        | OAuthError::MissingVerifier
        | OAuthError::NoPendingLogin
        | OAuthError::StateMismatch => StatusCode::BAD_REQUEST,
        OAuthError::MissingRefreshToken
        | OAuthError::Exchange { .. }
        | OAuthError::Http(_)
        | OAuthError::Profile(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ServerError(err.into(), status)
}

/// Start the X OAuth flow
pub async fn login(
    State(state): State<AppState>,
    cookies: SessionCookies,
) -> ServerResult<Json<LoginResponse>, StatusCode> {
    let (auth_url, pending) = state.oauth.begin_login()?;
    cookies.set_pending_login(&pending)?;

    info!("Starting X login");
    Ok(Json(LoginResponse { auth_url }))
}

/// Handle the OAuth callback - store the user's tokens
pub async fn callback(
    State(state): State<AppState>,
    cookies: SessionCookies,
    Query(params): Query<CallbackParams>,
) -> ServerResult<Response, StatusCode> {
    // If X sent back an error, hand it to the caller
    if let Some(error) = params.error {
        warn!(
            "OAuth error from X: {} ({:?})",
            error, params.error_description
        );
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": error,
                "description": params.error_description,
            })),
        )
            .into_response());
    }

    let code = params.code.ok_or_else(|| reject(OAuthError::MissingCode))?;
    let pending = cookies
        .pending_login()
        .ok_or_else(|| reject(OAuthError::NoPendingLogin))?;

    if params.state.as_deref() != Some(pending.state.as_str()) {
        error!("Callback state does not match the login in progress");
        return Err(reject(OAuthError::StateMismatch));
    }

    let record = state
        .oauth
        .complete_login(Some(&code), Some(&pending.code_verifier))
        .await
        .map_err(reject)?;
    cookies.clear_pending_login();

    let response = CallbackResponse {
        user_id: record.user_id.clone(),
        username: record.username.clone(),
    };

    state
        .credentials
        .upsert(record)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    info!("Stored credentials for @{}", response.username);

    match &state.config.post_login_redirect {
        Some(target) => Ok(Redirect::to(target).into_response()),
        None => Ok(Json(response).into_response()),
    }
}
