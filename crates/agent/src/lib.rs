//! Assistant-facing surface of the travel backend.
//!
//! The assistant itself lives elsewhere; this crate gives it two tools and the rules
//! around them:
//! - `lookup_policy` searches the embedded company policy (`lookup`, `embeddings`)
//! - `update_ticket_to_new_flight` runs the transactional rebooking from `wayfare-core`
//! - the write guardrail refuses booking changes until policy has been consulted
//!
//! Tool results are JSON payloads with a `status` field. Business rejections come back
//! as `{"status": "error", ...}` payloads, never as Rust errors, so the assistant can
//! relay them to the passenger.

pub mod embeddings;
pub mod guardrails;
pub mod lookup;
pub mod tools;

pub use embeddings::{Embedder, EmbeddingError, OpenAiEmbeddings};
pub use guardrails::{GuardrailDecision, WriteGuardrail};
pub use lookup::{ingest_policy_document, VectorPolicyLookup};
pub use tools::{travel_tools, Tool, ToolContext, ToolRegistry};
