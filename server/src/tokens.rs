use chrono::Utc;
use tracing::info;

use crate::{oauth::TokenGrant, state::AppState, store::CredentialRecord};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The refresh token was rejected or the refresh call failed; the stored record is untouched
    #[error("Failed to refresh token for user {0}")]
    RefreshFailed(String),
    #[error(transparent)]
    Store(#[from] color_eyre::Report),
}

/// Apply a refreshed token pair to a record, restarting its lifetime at `now_ms`
pub fn apply_grant(record: &mut CredentialRecord, grant: TokenGrant, now_ms: i64) {
    record.access_token = grant.access_token;
    record.refresh_token = grant.refresh_token;
    record.expires_in = grant.expires_in;
    record.created_at = now_ms;
}

/// Return a record whose access token is usable, refreshing and persisting it first if it expired
pub async fn ensure_fresh(
    state: &AppState,
    record: CredentialRecord,
) -> Result<CredentialRecord, TokenError> {
    if !record.is_expired() {
        return Ok(record);
    }

    info!(user_id = %record.user_id, "Access token expired, refreshing");

    let Some(grant) = state.oauth.refresh(&record.refresh_token).await else {
        return Err(TokenError::RefreshFailed(record.user_id));
    };

    let mut record = record;
    apply_grant(&mut record, grant, Utc::now().timestamp_millis());
    state.credentials.upsert(record.clone()).await?;

    info!(user_id = %record.user_id, "Stored refreshed token");
    Ok(record)
}
