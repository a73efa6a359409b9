use std::time::Duration;

use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, Tls, TlsOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use kudos_core::config::DatabaseConfig;
use kudos_core::domain::grant::GrantRecord;

use super::{GrantRepository, RepositoryError};

/// Grant ledger kept as one MongoDB collection of plain documents.
pub struct MongoGrantRepository {
    collection: Collection<GrantRecord>,
}

impl MongoGrantRepository {
    pub fn new(database: &Database, collection: &str) -> Self {
        Self { collection: database.collection(collection) }
    }

    /// Builds a client from the configured connection string. The driver connects lazily, so an
    /// unreachable cluster surfaces on the first operation rather than here.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let options = client_options(config).await?;
        let client = Client::with_options(options)?;
        Ok(Self::new(&client.database(&config.name), &config.collection))
    }
}

pub async fn client_options(config: &DatabaseConfig) -> Result<ClientOptions, RepositoryError> {
    let mut options = ClientOptions::parse(&config.url).await?;
    options.app_name = Some("kudos-bot".to_string());
    options.server_selection_timeout = Some(Duration::from_secs(config.timeout_secs));

    if let Some(ca_file) = &config.ca_file {
        options.tls = Some(Tls::Enabled(TlsOptions::builder().ca_file_path(ca_file.clone()).build()));
    }

    Ok(options)
}

#[async_trait::async_trait]
impl GrantRepository for MongoGrantRepository {
    async fn prepare(&self) -> Result<(), RepositoryError> {
        // Lookups are by recipient and by recency; neither index is needed for correctness.
        self.collection
            .create_index(IndexModel::builder().keys(doc! { "to": 1 }).build(), None)
            .await?;
        self.collection
            .create_index(IndexModel::builder().keys(doc! { "ts": -1 }).build(), None)
            .await?;
        Ok(())
    }

    async fn append(&self, record: GrantRecord) -> Result<(), RepositoryError> {
        self.collection.insert_one(&record, None).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<GrantRecord>, RepositoryError> {
        let cursor = self.collection.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.collection.count_documents(None, None).await?)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = self.collection.delete_many(doc! {}, None).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mongodb::options::Tls;

    use kudos_core::config::AppConfig;

    use super::client_options;

    #[tokio::test]
    async fn client_options_apply_timeout_and_trust_bundle() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let ca_file = dir.path().join("ca.pem");
        std::fs::write(&ca_file, "-----BEGIN CERTIFICATE-----\n").expect("write bundle");

        let mut database = AppConfig::default().database;
        database.url = "mongodb://db.internal:27017".to_string();
        database.ca_file = Some(ca_file.clone());

        let options = client_options(&database).await.expect("parse options");

        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.app_name.as_deref(), Some("kudos-bot"));
        match options.tls {
            Some(Tls::Enabled(tls)) => assert_eq!(tls.ca_file_path, Some(ca_file)),
            other => panic!("expected tls to be enabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_connection_string_is_reported() {
        let mut database = AppConfig::default().database;
        database.url = "mongodb://".to_string();

        assert!(client_options(&database).await.is_err());
    }
}
