use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use wayfare_core::domain::policy::{PassageId, PolicyPassage, ScoredPassage};
use wayfare_core::retrieval::{rank_passages, split_policy_document};
use wayfare_core::{PolicyLookup, PolicyLookupError};
use wayfare_db::repositories::PolicyPassageRepository;

use crate::embeddings::Embedder;

/// Similarity search over one stored policy collection.
pub struct VectorPolicyLookup {
    embedder: Arc<dyn Embedder>,
    repository: Arc<dyn PolicyPassageRepository>,
    collection: String,
}

impl VectorPolicyLookup {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        repository: Arc<dyn PolicyPassageRepository>,
        collection: impl Into<String>,
    ) -> Self {
        Self { embedder, repository, collection: collection.into() }
    }
}

#[async_trait]
impl PolicyLookup for VectorPolicyLookup {
    async fn lookup(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, PolicyLookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PolicyLookupError::EmptyQuery);
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|error| PolicyLookupError::Embedding(error.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| PolicyLookupError::Embedding("no embedding returned".to_string()))?;

        let passages = self
            .repository
            .list_collection(&self.collection)
            .await
            .map_err(|error| PolicyLookupError::Store(error.to_string()))?;

        Ok(rank_passages(&query_embedding, passages, k))
    }
}

/// Splits `document`, embeds every passage and replaces `collection` with the result.
pub async fn ingest_policy_document(
    embedder: &dyn Embedder,
    repository: &dyn PolicyPassageRepository,
    collection: &str,
    document: &str,
) -> Result<usize, PolicyLookupError> {
    let chunks = split_policy_document(document);
    let embeddings = embedder
        .embed(&chunks)
        .await
        .map_err(|error| PolicyLookupError::Embedding(error.to_string()))?;

    let passages: Vec<PolicyPassage> = chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (content, embedding))| PolicyPassage {
            id: PassageId(format!("{collection}-{index:04}")),
            collection: collection.to_string(),
            content,
            embedding,
        })
        .collect();

    let stored = repository
        .replace_collection(collection, passages)
        .await
        .map_err(|error| PolicyLookupError::Store(error.to_string()))?;

    info!(
        event_name = "policy.ingested",
        collection = %collection,
        passages = stored,
        "policy document ingested"
    );
    Ok(stored)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use wayfare_core::{PolicyLookup, PolicyLookupError};
    use wayfare_db::repositories::{InMemoryPolicyPassageRepository, PolicyPassageRepository};

    use super::{ingest_policy_document, VectorPolicyLookup};
    use crate::embeddings::{Embedder, EmbeddingError};

    const POLICY_DOCUMENT: &str = "\
## Ticket rebooking
Tickets may be moved to another flight of the same route for a fee.

## Baggage
Each passenger may check one bag up to 23 kg.

## Refunds
Refunds are issued to the original payment method.
";

    /// Embeds by keyword presence so tests can steer ranking without a network.
    pub(crate) struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    ["rebook", "bag", "refund"]
                        .iter()
                        .map(|keyword| if text.contains(keyword) { 1.0 } else { 0.05 })
                        .collect()
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Api { status: 503, message: "overloaded".to_string() })
        }
    }

    pub(crate) async fn seeded_lookup() -> VectorPolicyLookup {
        let repository = Arc::new(InMemoryPolicyPassageRepository::default());
        ingest_policy_document(&KeywordEmbedder, repository.as_ref(), "airline_policies", POLICY_DOCUMENT)
            .await
            .expect("ingest");
        VectorPolicyLookup::new(Arc::new(KeywordEmbedder), repository, "airline_policies")
    }

    #[tokio::test]
    async fn ingest_stores_one_passage_per_heading() {
        let repository = InMemoryPolicyPassageRepository::default();
        let stored =
            ingest_policy_document(&KeywordEmbedder, &repository, "airline_policies", POLICY_DOCUMENT)
                .await
                .expect("ingest");

        assert_eq!(stored, 3);
        assert_eq!(repository.count_collection("airline_policies").await.expect("count"), 3);
    }

    #[tokio::test]
    async fn lookup_returns_most_relevant_passages_first() {
        let lookup = seeded_lookup().await;

        let passages = lookup.lookup("can I rebook my flight?", 2).await.expect("lookup");

        assert_eq!(passages.len(), 2);
        assert!(passages[0].content.starts_with("## Ticket rebooking"));
        assert!(passages[0].score > passages[1].score);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_embedding() {
        let lookup = VectorPolicyLookup::new(
            Arc::new(FailingEmbedder),
            Arc::new(InMemoryPolicyPassageRepository::default()),
            "airline_policies",
        );

        assert!(matches!(lookup.lookup("   ", 2).await, Err(PolicyLookupError::EmptyQuery)));
        assert!(matches!(
            lookup.lookup("baggage", 2).await,
            Err(PolicyLookupError::Embedding(message)) if message.contains("overloaded")
        ));
    }

    #[tokio::test]
    async fn empty_collection_yields_no_passages() {
        let lookup = VectorPolicyLookup::new(
            Arc::new(KeywordEmbedder),
            Arc::new(InMemoryPolicyPassageRepository::default()),
            "airline_policies",
        );
        assert!(lookup.lookup("refund", 2).await.expect("lookup").is_empty());
    }
}
