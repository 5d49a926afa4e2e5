//! Policy retrieval seam.
//!
//! The assistant consults company policy before any write. Retrieval is a plain
//! similarity search: the query is embedded by an external provider and ranked
//! against stored passage embeddings.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::policy::{PolicyPassage, ScoredPassage};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PolicyLookupError {
    #[error("policy query must not be empty")]
    EmptyQuery,
    #[error("embedding provider failure: {0}")]
    Embedding(String),
    #[error("policy store failure: {0}")]
    Store(String),
}

#[async_trait]
pub trait PolicyLookup: Send + Sync {
    /// Returns up to `k` passages ordered from most to least relevant.
    async fn lookup(&self, query: &str, k: usize) -> Result<Vec<ScoredPassage>, PolicyLookupError>;
}

/// Joins retrieved passages the way the assistant tool presents them.
pub fn render_passages(passages: &[ScoredPassage]) -> String {
    passages.iter().map(|passage| passage.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        None
    } else {
        Some(dot / denom)
    }
}

/// Scores every passage against `query` and keeps the best `k`.
///
/// Passages whose embedding has a different dimension than the query are skipped.
/// Ties keep their stored order.
pub fn rank_passages(query: &[f32], passages: Vec<PolicyPassage>, k: usize) -> Vec<ScoredPassage> {
    let mut scored: Vec<ScoredPassage> = passages
        .into_iter()
        .filter_map(|passage| {
            let score = cosine_similarity(query, &passage.embedding)?;
            Some(ScoredPassage { id: passage.id, content: passage.content, score })
        })
        .collect();
    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored.truncate(k);
    scored
}

/// Splits a markdown policy document into passages at second-level headings.
///
/// Text before the first `## ` heading forms its own passage. Blank chunks are dropped.
pub fn split_policy_document(document: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();

    for line in document.lines() {
        if line.starts_with("## ") && !current.trim().is_empty() {
            passages.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        passages.push(current.trim().to_string());
    }

    passages
}
