use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How long a login may take between `/auth/login` and the callback
pub const PENDING_LOGIN_TTL_SECS: i64 = 10 * 60;

/// Represents the data kept in the caller's session while they are at the authorization page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLogin {
    /// PKCE code verifier - the original random string
    pub code_verifier: String,
    /// State parameter passed to the authorize endpoint
    pub state: String,
    /// The timestamp when this login was started (Unix seconds)
    pub created_at: i64,
}

impl PendingLogin {
    pub fn new(code_verifier: String, state: String) -> Self {
        Self {
            code_verifier,
            state,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Check if this login was started too long ago to be completed
    pub fn is_expired(&self) -> bool {
        self.created_at + PENDING_LOGIN_TTL_SECS < Utc::now().timestamp()
    }
}
