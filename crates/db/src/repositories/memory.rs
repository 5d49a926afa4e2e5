use std::collections::HashMap;

use tokio::sync::RwLock;

use wayfare_core::domain::policy::PolicyPassage;

use super::{PolicyPassageRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryPolicyPassageRepository {
    collections: RwLock<HashMap<String, Vec<PolicyPassage>>>,
}

#[async_trait::async_trait]
impl PolicyPassageRepository for InMemoryPolicyPassageRepository {
    async fn replace_collection(
        &self,
        collection: &str,
        passages: Vec<PolicyPassage>,
    ) -> Result<usize, RepositoryError> {
        let count = passages.len();
        let mut collections = self.collections.write().await;
        collections.insert(collection.to_string(), passages);
        Ok(count)
    }

    async fn list_collection(&self, collection: &str) -> Result<Vec<PolicyPassage>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn count_collection(&self, collection: &str) -> Result<u64, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|passages| passages.len() as u64).unwrap_or(0))
    }
}
