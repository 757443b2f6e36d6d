use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use color_eyre::eyre::eyre;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    api::{ApiError, LikedPost},
    errors::{ServerError, ServerResult},
    state::AppState,
    tokens::{self, TokenError},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikesResponse {
    pub user_id: String,
    pub likes: Vec<LikedPost>,
    pub count: usize,
}

/// Fetch a stored user's most recent liked posts, refreshing their token first if needed
#[tracing::instrument(skip(state))]
pub async fn list_likes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ServerResult<Json<LikesResponse>, StatusCode> {
    let record = match state.credentials.find(&user_id).await? {
        Some(record) => record,
        None => {
            info!("No stored credentials for user {}", user_id);
            return Err(ServerError(
                eyre!("No stored credentials for user {}", user_id),
                StatusCode::NOT_FOUND,
            ));
        }
    };

    let record = match tokens::ensure_fresh(&state, record).await {
        Ok(record) => record,
        Err(err @ TokenError::RefreshFailed(_)) => {
            return Err(ServerError(
                eyre!("{err}. Please authenticate again."),
                StatusCode::UNAUTHORIZED,
            ));
        }
        Err(TokenError::Store(err)) => return Err(err.into()),
    };

    let likes = match state
        .x_api
        .liked_posts(&record.user_id, &record.access_token)
        .await
    {
        Ok(likes) => likes,
        Err(ApiError::Unauthorized) => {
            return Err(ServerError(
                eyre!("X rejected the stored token. Please authenticate again."),
                StatusCode::UNAUTHORIZED,
            ));
        }
        Err(err) => {
            error!("Failed to fetch liked posts for {}: {}", user_id, err);
            return Err(err.into());
        }
    };

    Ok(Json(LikesResponse {
        user_id: record.user_id,
        count: likes.len(),
        likes,
    }))
}
