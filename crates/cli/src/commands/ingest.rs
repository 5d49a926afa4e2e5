use std::path::Path;

use wayfare_agent::{ingest_policy_document, OpenAiEmbeddings};
use wayfare_db::repositories::SqlPolicyPassageRepository;

use crate::commands::{
    build_runtime, load_config, open_migrated_pool, CommandResult, EXIT_CONFIG, EXIT_EXECUTION,
};

/// Embeds a markdown policy document and replaces the configured collection with it.
pub fn run(file: &Path) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("ingest-policies", failure),
    };

    let api_key = match config.require_embeddings_api_key() {
        Ok(api_key) => api_key.clone(),
        Err(error) => {
            return CommandResult::failure(
                "ingest-policies",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let document = match std::fs::read_to_string(file) {
        Ok(document) => document,
        Err(error) => {
            return CommandResult::failure(
                "ingest-policies",
                "invalid_input",
                format!("could not read policy document `{}`: {error}", file.display()),
                EXIT_CONFIG,
            )
        }
    };

    let embedder = match OpenAiEmbeddings::new(api_key, &config.embeddings) {
        Ok(embedder) => embedder,
        Err(error) => {
            return CommandResult::failure(
                "ingest-policies",
                "embeddings_client",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return CommandResult::from_failure("ingest-policies", failure),
    };

    let collection = config.retrieval.collection_name.clone();
    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let repository = SqlPolicyPassageRepository::new(pool.clone());
        let stored = ingest_policy_document(&embedder, &repository, &collection, &document).await;
        pool.close().await;
        stored.map_err(|error| ("policy_ingest", error.to_string(), EXIT_EXECUTION))
    });

    match result {
        Ok(stored) => CommandResult::success(
            "ingest-policies",
            format!("stored {stored} policy passages in collection `{collection}`"),
        ),
        Err(failure) => CommandResult::from_failure("ingest-policies", failure),
    }
}
