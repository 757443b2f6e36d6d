use tracing::{error, info, warn};

use crate::{
    api::LikedPost,
    state::AppState,
    tokens::{self, TokenError},
};

/// What happened to one user during a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    /// Liked posts were fetched (after a refresh if `refreshed`)
    Fetched { refreshed: bool, count: usize },
    /// The expired token could not be refreshed; the user was skipped this cycle
    RefreshFailed,
    /// The refreshed token could not be stored; nothing was fetched
    StoreFailed(String),
    /// Fetching liked posts failed
    FetchFailed(String),
}

/// Outcome of one pass over every stored user, in store order
#[derive(Debug, Default)]
pub struct PollReport {
    pub users: Vec<(String, UserOutcome)>,
}

impl PollReport {
    pub fn outcome(&self, user_id: &str) -> Option<&UserOutcome> {
        self.users
            .iter()
            .find(|(id, _)| id == user_id)
            .map(|(_, outcome)| outcome)
    }
}

/// Refresh stale tokens and fetch recent likes for every stored user, one at a time
///
/// A failure for one user is logged and never stops the remaining users from
/// being processed. Only failing to read the store aborts the pass.
#[tracing::instrument(skip_all, err)]
pub async fn poll_liked_posts(state: &AppState) -> color_eyre::Result<PollReport> {
    let records = state.credentials.all().await?;
    info!("Polling liked posts for {} users", records.len());

    let mut report = PollReport::default();

    for record in records {
        let user_id = record.user_id.clone();
        let was_expired = record.is_expired();

        let record = match tokens::ensure_fresh(state, record).await {
            Ok(record) => record,
            Err(TokenError::RefreshFailed(_)) => {
                warn!(user_id = %user_id, "Skipping user, token refresh failed");
                report.users.push((user_id, UserOutcome::RefreshFailed));
                continue;
            }
            Err(TokenError::Store(err)) => {
                error!(user_id = %user_id, "Failed to store refreshed token: {:?}", err);
                report
                    .users
                    .push((user_id, UserOutcome::StoreFailed(err.to_string())));
                continue;
            }
        };

        match state
            .x_api
            .liked_posts(&record.user_id, &record.access_token)
            .await
        {
            Ok(likes) => {
                log_likes(&record.username, &likes);
                report.users.push((
                    user_id,
                    UserOutcome::Fetched {
                        refreshed: was_expired,
                        count: likes.len(),
                    },
                ));
            }
            Err(err) => {
                error!(user_id = %user_id, "Failed to fetch liked posts: {}", err);
                report
                    .users
                    .push((user_id, UserOutcome::FetchFailed(err.to_string())));
            }
        }
    }

    info!("Finished polling liked posts");
    Ok(report)
}

fn log_likes(username: &str, likes: &[LikedPost]) {
    info!("@{} has {} recent liked posts", username, likes.len());
    for like in likes {
        info!(
            post_id = %like.id,
            author_id = like.author_id.as_deref().unwrap_or("unknown"),
            created_at = like.created_at.as_deref().unwrap_or("unknown"),
            "{}",
            like.text
        );
    }
}
