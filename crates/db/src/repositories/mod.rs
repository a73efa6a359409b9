use async_trait::async_trait;
use thiserror::Error;

use kudos_core::domain::grant::GrantRecord;

pub mod grant;
pub mod memory;
pub mod mongo;

pub use grant::SqlGrantRepository;
pub use memory::InMemoryGrantRepository;
pub use mongo::MongoGrantRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("document store error: {0}")]
    DocumentStore(#[from] mongodb::error::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Append-only grant ledger.
///
/// Each call is independent: there is no batch transaction, so a caller appending several records
/// may end up with some of them stored.
#[async_trait]
pub trait GrantRepository: Send + Sync {
    /// Prepares the backing store (indexes, schema). Safe to call on every start.
    async fn prepare(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn append(&self, record: GrantRecord) -> Result<(), RepositoryError>;

    /// Every stored record, in whatever order the store yields them.
    async fn load_all(&self) -> Result<Vec<GrantRecord>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Operator wipe; returns how many records were removed.
    async fn delete_all(&self) -> Result<u64, RepositoryError>;
}
