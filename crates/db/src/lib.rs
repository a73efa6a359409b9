pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{
    connect, connect_grant_repository, connect_with_settings, redact_credentials, DbPool,
};
pub use repositories::{GrantRepository, InMemoryGrantRepository, RepositoryError};
