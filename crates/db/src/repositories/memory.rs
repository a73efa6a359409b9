use tokio::sync::RwLock;

use kudos_core::domain::grant::GrantRecord;

use super::{GrantRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryGrantRepository {
    records: RwLock<Vec<GrantRecord>>,
}

impl InMemoryGrantRepository {
    pub fn with_records(records: Vec<GrantRecord>) -> Self {
        Self { records: RwLock::new(records) }
    }

    pub async fn snapshot(&self) -> Vec<GrantRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait::async_trait]
impl GrantRepository for InMemoryGrantRepository {
    async fn append(&self, record: GrantRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<GrantRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.clone())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}
