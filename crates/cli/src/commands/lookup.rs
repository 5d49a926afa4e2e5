use std::sync::Arc;

use serde_json::json;
use wayfare_agent::{OpenAiEmbeddings, VectorPolicyLookup};
use wayfare_core::retrieval::render_passages;
use wayfare_core::{PolicyLookup, PolicyLookupError};
use wayfare_db::repositories::SqlPolicyPassageRepository;

use crate::commands::{
    build_runtime, load_config, open_migrated_pool, CommandResult, EXIT_CONFIG, EXIT_EXECUTION,
    EXIT_REJECTED,
};

pub fn run(query: &str) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("lookup-policy", failure),
    };

    if query.trim().is_empty() {
        return CommandResult::failure(
            "lookup-policy",
            "empty_query",
            PolicyLookupError::EmptyQuery.to_string(),
            EXIT_REJECTED,
        );
    }

    let embedder = match config
        .require_embeddings_api_key()
        .map_err(|error| error.to_string())
        .and_then(|api_key| {
            OpenAiEmbeddings::new(api_key.clone(), &config.embeddings)
                .map_err(|error| error.to_string())
        }) {
        Ok(embedder) => embedder,
        Err(message) => {
            return CommandResult::failure("lookup-policy", "config_validation", message, EXIT_CONFIG)
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("lookup-policy", failure),
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let lookup = VectorPolicyLookup::new(
            Arc::new(embedder),
            Arc::new(SqlPolicyPassageRepository::new(pool.clone())),
            config.retrieval.collection_name.clone(),
        );
        let passages = lookup.lookup(query, config.retrieval.k).await;
        pool.close().await;
        passages.map_err(|error| ("policy_lookup", error.to_string(), EXIT_EXECUTION))
    });

    match result {
        Ok(passages) => CommandResult::success_with_data(
            "lookup-policy",
            render_passages(&passages),
            Some(json!({ "passages": passages })),
        ),
        Err(failure) => CommandResult::from_failure("lookup-policy", failure),
    }
}
