use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{errors::ServerResult, state::AppState, store::CredentialRecord};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub username: String,
    pub name: String,
}

impl From<CredentialRecord> for UserSummary {
    fn from(record: CredentialRecord) -> Self {
        Self {
            user_id: record.user_id,
            username: record.username,
            name: record.name,
        }
    }
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

/// List every user with stored credentials, without their tokens
pub async fn list_users(State(state): State<AppState>) -> ServerResult<Json<UsersResponse>, StatusCode> {
    let records = state.credentials.all().await?;

    Ok(Json(UsersResponse {
        users: records.into_iter().map(UserSummary::from).collect(),
    }))
}
