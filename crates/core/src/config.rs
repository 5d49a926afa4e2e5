use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EMBEDDINGS_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub retrieval: RetrievalConfig,
    pub rebooking: RebookingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    pub backup_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmbeddingsConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub collection_name: String,
    pub k: usize,
}

#[derive(Clone, Debug)]
pub struct RebookingConfig {
    pub reference_utc_offset_hours: i32,
    pub min_lead_time_minutes: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub embeddings_api_key: Option<String>,
    pub embeddings_base_url: Option<String>,
    pub retrieval_k: Option<usize>,
    pub min_lead_time_minutes: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://travel.sqlite?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                backup_url: None,
            },
            embeddings: EmbeddingsConfig {
                api_key: None,
                base_url: DEFAULT_EMBEDDINGS_BASE_URL.to_string(),
                model: "text-embedding-3-small".to_string(),
                timeout_secs: 30,
            },
            retrieval: RetrievalConfig { collection_name: "airline_policies".to_string(), k: 2 },
            rebooking: RebookingConfig { reference_utc_offset_hours: 3, min_lead_time_minutes: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("wayfare.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(backup_url) = database.backup_url {
                self.database.backup_url = Some(backup_url);
            }
        }

        if let Some(embeddings) = patch.embeddings {
            if let Some(api_key) = embeddings.api_key {
                self.embeddings.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = embeddings.base_url {
                self.embeddings.base_url = base_url;
            }
            if let Some(model) = embeddings.model {
                self.embeddings.model = model;
            }
            if let Some(timeout_secs) = embeddings.timeout_secs {
                self.embeddings.timeout_secs = timeout_secs;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(collection_name) = retrieval.collection_name {
                self.retrieval.collection_name = collection_name;
            }
            if let Some(k) = retrieval.k {
                self.retrieval.k = k;
            }
        }

        if let Some(rebooking) = patch.rebooking {
            if let Some(offset) = rebooking.reference_utc_offset_hours {
                self.rebooking.reference_utc_offset_hours = offset;
            }
            if let Some(minutes) = rebooking.min_lead_time_minutes {
                self.rebooking.min_lead_time_minutes = Some(minutes);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("WAYFARE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("WAYFARE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("WAYFARE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("WAYFARE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("WAYFARE_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("WAYFARE_DATABASE_BACKUP_URL") {
            self.database.backup_url = Some(value);
        }

        // OPENAI_* are honoured for compatibility with existing assistant deployments.
        let api_key = read_env("WAYFARE_EMBEDDINGS_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = api_key {
            self.embeddings.api_key = Some(secret_value(value));
        }
        let base_url =
            read_env("WAYFARE_EMBEDDINGS_BASE_URL").or_else(|| read_env("OPENAI_API_BASE"));
        if let Some(value) = base_url {
            self.embeddings.base_url = value;
        }
        if let Some(value) = read_env("WAYFARE_EMBEDDINGS_MODEL") {
            self.embeddings.model = value;
        }
        if let Some(value) = read_env("WAYFARE_EMBEDDINGS_TIMEOUT_SECS") {
            self.embeddings.timeout_secs = parse_u64("WAYFARE_EMBEDDINGS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("WAYFARE_RETRIEVAL_COLLECTION_NAME") {
            self.retrieval.collection_name = value;
        }
        if let Some(value) = read_env("WAYFARE_RETRIEVAL_K") {
            self.retrieval.k = parse_usize("WAYFARE_RETRIEVAL_K", &value)?;
        }

        if let Some(value) = read_env("WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS") {
            self.rebooking.reference_utc_offset_hours =
                parse_i32("WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS", &value)?;
        }
        if let Some(value) = read_env("WAYFARE_REBOOKING_MIN_LEAD_TIME_MINUTES") {
            self.rebooking.min_lead_time_minutes =
                Some(parse_u64("WAYFARE_REBOOKING_MIN_LEAD_TIME_MINUTES", &value)?);
        }

        let log_level = read_env("WAYFARE_LOGGING_LEVEL").or_else(|| read_env("WAYFARE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("WAYFARE_LOGGING_FORMAT").or_else(|| read_env("WAYFARE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(api_key) = overrides.embeddings_api_key {
            self.embeddings.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.embeddings_base_url {
            self.embeddings.base_url = base_url;
        }
        if let Some(k) = overrides.retrieval_k {
            self.retrieval.k = k;
        }
        if let Some(minutes) = overrides.min_lead_time_minutes {
            self.rebooking.min_lead_time_minutes = Some(minutes);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_embeddings(&self.embeddings)?;
        validate_retrieval(&self.retrieval)?;
        validate_rebooking(&self.rebooking)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// The embeddings key is optional at load time and only enforced by callers that embed.
    pub fn require_embeddings_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.embeddings
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "embeddings.api_key is required (set WAYFARE_EMBEDDINGS_API_KEY or OPENAI_API_KEY)"
                        .to_string(),
                )
            })
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("wayfare.toml"), PathBuf::from("config/wayfare.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_sqlite_url(url: &str) -> bool {
    url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:"
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if !is_sqlite_url(database.url.trim()) {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if let Some(backup_url) = &database.backup_url {
        if !backup_url.trim().starts_with("sqlite://") {
            return Err(ConfigError::Validation(
                "database.backup_url must be a file-backed sqlite URL (`sqlite://...`)".to_string(),
            ));
        }
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_embeddings(embeddings: &EmbeddingsConfig) -> Result<(), ConfigError> {
    let base_url = embeddings.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "embeddings.base_url must start with http:// or https://".to_string(),
        ));
    }

    if embeddings.model.trim().is_empty() {
        return Err(ConfigError::Validation("embeddings.model must not be empty".to_string()));
    }

    if embeddings.timeout_secs == 0 || embeddings.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "embeddings.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.collection_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "retrieval.collection_name must not be empty".to_string(),
        ));
    }

    if retrieval.k == 0 || retrieval.k > 20 {
        return Err(ConfigError::Validation("retrieval.k must be in range 1..=20".to_string()));
    }

    Ok(())
}

fn validate_rebooking(rebooking: &RebookingConfig) -> Result<(), ConfigError> {
    if !(-12..=14).contains(&rebooking.reference_utc_offset_hours) {
        return Err(ConfigError::Validation(
            "rebooking.reference_utc_offset_hours must be in range -12..=14".to_string(),
        ));
    }

    if rebooking.min_lead_time_minutes.is_some_and(|minutes| minutes > 7 * 24 * 60) {
        return Err(ConfigError::Validation(
            "rebooking.min_lead_time_minutes must not exceed one week (10080)".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.trim().parse::<i32>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    embeddings: Option<EmbeddingsPatch>,
    retrieval: Option<RetrievalPatch>,
    rebooking: Option<RebookingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    backup_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingsPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    collection_name: Option<String>,
    k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RebookingPatch {
    reference_utc_offset_hours: Option<i32>,
    min_lead_time_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: &[&str] = &[
        "WAYFARE_DATABASE_URL",
        "WAYFARE_EMBEDDINGS_API_KEY",
        "WAYFARE_EMBEDDINGS_BASE_URL",
        "WAYFARE_RETRIEVAL_K",
        "WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS",
        "WAYFARE_REBOOKING_MIN_LEAD_TIME_MINUTES",
        "WAYFARE_LOG_LEVEL",
        "WAYFARE_LOG_FORMAT",
        "WAYFARE_LOGGING_LEVEL",
        "WAYFARE_LOGGING_FORMAT",
        "OPENAI_API_KEY",
        "OPENAI_API_BASE",
        "TEST_WAYFARE_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars() {
        for var in MANAGED_VARS {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.rebooking.reference_utc_offset_hours == 3, "default offset should be +3")?;
        ensure(
            config.rebooking.min_lead_time_minutes.is_none(),
            "lead time rule should be off by default",
        )?;
        ensure(config.retrieval.k == 2, "default k should be 2")?;
        ensure(config.embeddings.api_key.is_none(), "api key should be unset by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("TEST_WAYFARE_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("wayfare.toml");
            fs::write(
                &path,
                r#"
[embeddings]
api_key = "${TEST_WAYFARE_API_KEY}"

[retrieval]
collection_name = "swiss_faq"
k = 4
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.require_embeddings_api_key().map_err(|err| err.to_string())?;
            ensure(key.expose_secret() == "sk-from-env", "api key should be interpolated")?;
            ensure(config.retrieval.collection_name == "swiss_faq", "collection from file")?;
            ensure(config.retrieval.k == 4, "k from file")
        })();

        clear_vars();
        result
    }

    #[test]
    fn openai_env_vars_are_used_as_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("OPENAI_API_KEY", "sk-openai");
        env::set_var("OPENAI_API_BASE", "https://proxy.example.com/v1");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let key = config.require_embeddings_api_key().map_err(|err| err.to_string())?;
            ensure(key.expose_secret() == "sk-openai", "OPENAI_API_KEY should be used")?;
            ensure(
                config.embeddings.base_url == "https://proxy.example.com/v1",
                "OPENAI_API_BASE should be used",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("WAYFARE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("WAYFARE_REBOOKING_MIN_LEAD_TIME_MINUTES", "90");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("wayfare.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[rebooking]
reference_utc_offset_hours = 1
min_lead_time_minutes = 30

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.rebooking.min_lead_time_minutes == Some(90),
                "env lead time should win over file",
            )?;
            ensure(
                config.rebooking.reference_utc_offset_hours == 1,
                "file offset should win over default",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn validation_rejects_out_of_range_retrieval_k() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("WAYFARE_RETRIEVAL_K", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("retrieval.k")),
                "validation failure should mention retrieval.k",
            )
        })();

        clear_vars();
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS", "three");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "WAYFARE_REBOOKING_REFERENCE_UTC_OFFSET_HOURS",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars();
        result
    }

    #[test]
    fn missing_api_key_is_reported_on_demand() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(
            matches!(
                config.require_embeddings_api_key(),
                Err(ConfigError::Validation(ref message)) if message.contains("embeddings.api_key")
            ),
            "missing api key should produce an actionable error",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars();
        env::set_var("WAYFARE_EMBEDDINGS_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");
            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars();
        result
    }
}
