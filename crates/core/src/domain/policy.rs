use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassageId(pub String);

/// A chunk of the company policy document together with its embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyPassage {
    pub id: PassageId,
    pub collection: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: PassageId,
    pub content: String,
    pub score: f32,
}
