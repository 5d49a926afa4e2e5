use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use wayfare_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let embeddings_api_key = match &config.embeddings.api_key {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    let min_lead_time = config
        .rebooking
        .min_lead_time_minutes
        .map(|minutes| minutes.to_string())
        .unwrap_or_else(|| "<unset> (any departure permitted)".to_string());

    let fields: [(&str, String, &[&str]); 14] = [
        ("database.url", config.database.url.clone(), &["WAYFARE_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["WAYFARE_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["WAYFARE_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "database.backup_url",
            config.database.backup_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["WAYFARE_DATABASE_BACKUP_URL"],
        ),
        (
            "embeddings.api_key",
            embeddings_api_key,
            &["WAYFARE_EMBEDDINGS_API_KEY", "OPENAI_API_KEY"],
        ),
        (
            "embeddings.base_url",
            config.embeddings.base_url.clone(),
            &["WAYFARE_EMBEDDINGS_BASE_URL", "OPENAI_API_BASE"],
        ),
        ("embeddings.model", config.embeddings.model.clone(), &["WAYFARE_EMBEDDINGS_MODEL"]),
        (
            "embeddings.timeout_secs",
            config.embeddings.timeout_secs.to_string(),
            &["WAYFARE_EMBEDDINGS_TIMEOUT_SECS"],
        ),
        (
            "retrieval.collection_name",
            config.retrieval.collection_name.clone(),
            &["WAYFARE_RETRIEVAL_COLLECTION_NAME"],
        ),
        ("retrieval.k", config.retrieval.k.to_string(), &["WAYFARE_RETRIEVAL_K"]),
        (
            "rebooking.reference_utc_offset_hours",
            config.rebooking.reference_utc_offset_hours.to_string(),
            &["WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS"],
        ),
        (
            "rebooking.min_lead_time_minutes",
            min_lead_time,
            &["WAYFARE_REBOOKING_MIN_LEAD_TIME_MINUTES"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["WAYFARE_LOGGING_LEVEL", "WAYFARE_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["WAYFARE_LOGGING_FORMAT", "WAYFARE_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in &fields {
        lines.push(render_line(
            key_path,
            value,
            field_source(
                key_path,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("wayfare.toml"), PathBuf::from("config/wayfare.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the provider prefix of keys such as `sk-proj-...` and hides the rest.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
