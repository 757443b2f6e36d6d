//! Persistence for per-user credential records
//!
//! [`TokenStore`] is the narrow load/save seam; [`Credentials`] layers the
//! lookups and the single-writer upsert on top of whichever store is plugged in.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Persisted token bundle for one authenticated X user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// X user id, unique across the document
    pub user_id: String,
    /// The @handle, without the @
    pub username: String,
    /// Display name
    pub name: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, counted from `created_at`
    pub expires_in: i64,
    /// When the access token was issued (Unix milliseconds)
    pub created_at: i64,
}

impl CredentialRecord {
    /// Unix milliseconds at which the access token stops being usable
    pub fn expires_at_ms(&self) -> i64 {
        self.created_at
            .saturating_add(self.expires_in.saturating_mul(1000))
    }

    /// Check if the access token is expired at `now_ms` (Unix milliseconds)
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms()
    }

    /// Check if the access token is expired right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

/// Backing store for the credential document
///
/// `load` on a store that has never been written returns an empty list.
/// `save` replaces the whole document.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> color_eyre::Result<Vec<CredentialRecord>>;

    async fn save(&self, records: &[CredentialRecord]) -> color_eyre::Result<()>;
}

/// Shared handle to the credential document
///
/// All writes go through [`Credentials::upsert`], which holds a lock across the
/// read-modify-write so concurrent writers in this process cannot drop each
/// other's updates.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn TokenStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Credentials {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All stored records, in document order
    pub async fn all(&self) -> color_eyre::Result<Vec<CredentialRecord>> {
        self.store.load().await
    }

    /// Find the record for a user id
    pub async fn find(&self, user_id: &str) -> color_eyre::Result<Option<CredentialRecord>> {
        let records = self.store.load().await?;
        Ok(records.into_iter().find(|r| r.user_id == user_id))
    }

    /// Insert a record, or replace the existing record with the same user id in place
    pub async fn upsert(&self, record: CredentialRecord) -> color_eyre::Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.store.load().await?;
        match records.iter_mut().find(|r| r.user_id == record.user_id) {
            Some(existing) => {
                info!(user_id = %record.user_id, "Updating stored credentials");
                *existing = record;
            }
            None => {
                info!(user_id = %record.user_id, "Storing credentials for new user");
                records.push(record);
            }
        }

        self.store.save(&records).await
    }
}

#[cfg(test)]
pub(crate) fn test_record(user_id: &str, created_at: i64, expires_in: i64) -> CredentialRecord {
    CredentialRecord {
        user_id: user_id.to_string(),
        username: format!("user_{user_id}"),
        name: format!("User {user_id}"),
        access_token: format!("access-{user_id}"),
        refresh_token: format!("refresh-{user_id}"),
        expires_in,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let record = test_record("1", 1_000_000, 60);

        assert!(!record.is_expired_at(1_000_000));
        assert!(!record.is_expired_at(1_059_999));
        assert!(record.is_expired_at(1_060_000));
        assert!(record.is_expired_at(2_000_000));
    }

    #[test]
    fn test_zero_lifetime_is_expired_immediately() {
        let record = test_record("1", 5_000, 0);
        assert!(record.is_expired_at(5_000));
    }

    #[test]
    fn test_fresh_record_is_not_expired_now() {
        let record = test_record("1", Utc::now().timestamp_millis(), 7200);
        assert!(!record.is_expired());
    }

    #[test]
    fn test_serializes_with_camel_case_fields() {
        let record = test_record("42", 1_700_000_000_000, 7200);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["userId"], "42");
        assert_eq!(json["accessToken"], "access-42");
        assert_eq!(json["refreshToken"], "refresh-42");
        assert_eq!(json["expiresIn"], 7200);
        assert_eq!(json["createdAt"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn test_upsert_appends_new_users_in_order() {
        let credentials = Credentials::new(Arc::new(MemoryStore::default()));

        credentials.upsert(test_record("a", 0, 10)).await.unwrap();
        credentials.upsert(test_record("b", 0, 10)).await.unwrap();

        let ids: Vec<_> = credentials
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_user_in_place() {
        let credentials = Credentials::new(Arc::new(MemoryStore::default()));
        credentials.upsert(test_record("a", 0, 10)).await.unwrap();
        credentials.upsert(test_record("b", 0, 10)).await.unwrap();

        let mut updated = test_record("a", 99, 20);
        updated.access_token = "new-access".to_string();
        credentials.upsert(updated.clone()).await.unwrap();

        let records = credentials.all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], updated);
        assert_eq!(records[1].user_id, "b");
    }

    #[tokio::test]
    async fn test_concurrent_upserts_keep_every_user() {
        let credentials = Credentials::new(Arc::new(MemoryStore::default()));

        let handles: Vec<_> = (0..20)
            .map(|n| {
                let credentials = credentials.clone();
                tokio::spawn(async move {
                    credentials
                        .upsert(test_record(&n.to_string(), 0, 10))
                        .await
                })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap().unwrap();
        }

        assert_eq!(credentials.all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_find_returns_matching_record() {
        let credentials = Credentials::new(Arc::new(MemoryStore::default()));
        credentials.upsert(test_record("a", 0, 10)).await.unwrap();

        assert_eq!(
            credentials.find("a").await.unwrap().map(|r| r.username),
            Some("user_a".to_string())
        );
        assert!(credentials.find("missing").await.unwrap().is_none());
    }
}
