use tokio::sync::RwLock;

use super::{CredentialRecord, TokenStore};

/// In-process store, for tests and throwaway deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CredentialRecord>>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<CredentialRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> color_eyre::Result<Vec<CredentialRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn save(&self, records: &[CredentialRecord]) -> color_eyre::Result<()> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }
}
