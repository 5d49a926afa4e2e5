use async_trait::async_trait;
use thiserror::Error;

use wayfare_core::domain::policy::PolicyPassage;
use wayfare_core::errors::StorageError;

pub mod memory;
pub mod policy;
pub mod rebooking;

pub use memory::InMemoryPolicyPassageRepository;
pub use policy::SqlPolicyPassageRepository;
pub use rebooking::{find_boarding_pass, SqlRebookingStore, SqlRebookingTransaction};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StorageError {
    fn from(value: RepositoryError) -> Self {
        StorageError::new(value.to_string())
    }
}

#[async_trait]
pub trait PolicyPassageRepository: Send + Sync {
    /// Replaces every passage of `collection` with `passages` in one transaction.
    async fn replace_collection(
        &self,
        collection: &str,
        passages: Vec<PolicyPassage>,
    ) -> Result<usize, RepositoryError>;

    async fn list_collection(&self, collection: &str) -> Result<Vec<PolicyPassage>, RepositoryError>;

    async fn count_collection(&self, collection: &str) -> Result<u64, RepositoryError>;
}
