use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::grant::ChannelId;

pub const DEFAULT_MONTHLY_LIMIT: u32 = 40;
pub const DEFAULT_AVATAR_URL: &str = "https://a.slack-edge.com/80588/img/services/api_512.png";
pub const DEFAULT_OFFICIAL_CHANNEL_ID: &str = "C0A1GB750BW";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub kudos: KudosConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Connection string; `mongodb://`, `mongodb+srv://` or a sqlite URL for local runs.
    pub url: String,
    /// PEM bundle of trust anchors for the TLS connection to the store.
    pub ca_file: Option<PathBuf>,
    pub name: String,
    pub collection: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub api_base_url: String,
}

/// Recognition rules handed to the views and handlers at construction time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KudosConfig {
    pub official_channel_id: String,
    pub monthly_limit: u32,
    pub default_avatar_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseBackend {
    Mongo,
    Sqlite,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub official_channel_id: Option<String>,
    pub monthly_limit: Option<u32>,
    pub health_check_port: Option<u16>,
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
                url: String::new(),
                ca_file: None,
                name: "kudos_db".to_string(),
                collection: "transacciones".to_string(),
                timeout_secs: 5,
            },
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                api_base_url: "https://slack.com/api".to_string(),
            },
            kudos: KudosConfig::default(),
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), health_check_port: 10000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for KudosConfig {
    fn default() -> Self {
        Self {
            official_channel_id: DEFAULT_OFFICIAL_CHANNEL_ID.to_string(),
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

impl KudosConfig {
    pub fn official_channel(&self) -> ChannelId {
        ChannelId::new(self.official_channel_id.clone())
    }
}

impl DatabaseConfig {
    pub fn backend(&self) -> Option<DatabaseBackend> {
        let url = self.url.trim();
        if url.starts_with("mongodb://") || url.starts_with("mongodb+srv://") {
            Some(DatabaseBackend::Mongo)
        } else if url.starts_with("sqlite:") || url == ":memory:" {
            Some(DatabaseBackend::Sqlite)
        } else {
            None
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("kudos.toml"));
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
            if let Some(ca_file) = database.ca_file {
                self.database.ca_file = Some(ca_file);
            }
            if let Some(name) = database.name {
                self.database.name = name;
            }
            if let Some(collection) = database.collection {
                self.database.collection = collection;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(slack_app_token_value) = slack.app_token {
                self.slack.app_token = secret_value(slack_app_token_value);
            }
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(kudos) = patch.kudos {
            if let Some(official_channel_id) = kudos.official_channel_id {
                self.kudos.official_channel_id = official_channel_id;
            }
            if let Some(monthly_limit) = kudos.monthly_limit {
                self.kudos.monthly_limit = monthly_limit;
            }
            if let Some(default_avatar_url) = kudos.default_avatar_url {
                self.kudos.default_avatar_url = default_avatar_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
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
        // Bare names are what the hosted deployment already exports.
        let database_url = read_env("KUDOS_DATABASE_URL").or_else(|| read_env("MONGO_URI"));
        if let Some(value) = database_url {
            self.database.url = value;
        }
        if let Some(value) = read_env("KUDOS_DATABASE_CA_FILE") {
            self.database.ca_file = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("KUDOS_DATABASE_NAME") {
            self.database.name = value;
        }
        if let Some(value) = read_env("KUDOS_DATABASE_COLLECTION") {
            self.database.collection = value;
        }
        if let Some(value) = read_env("KUDOS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("KUDOS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let app_token = read_env("KUDOS_SLACK_APP_TOKEN").or_else(|| read_env("SLACK_APP_TOKEN"));
        if let Some(value) = app_token {
            self.slack.app_token = secret_value(value);
        }
        let bot_token = read_env("KUDOS_SLACK_BOT_TOKEN").or_else(|| read_env("SLACK_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("KUDOS_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("KUDOS_OFFICIAL_CHANNEL_ID") {
            self.kudos.official_channel_id = value;
        }
        if let Some(value) = read_env("KUDOS_MONTHLY_LIMIT") {
            self.kudos.monthly_limit = parse_u32("KUDOS_MONTHLY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("KUDOS_DEFAULT_AVATAR_URL") {
            self.kudos.default_avatar_url = value;
        }

        if let Some(value) = read_env("KUDOS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("KUDOS_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("KUDOS_SERVER_HEALTH_CHECK_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.health_check_port = parse_u16("PORT", &value)?;
        }

        let log_level = read_env("KUDOS_LOGGING_LEVEL").or_else(|| read_env("KUDOS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("KUDOS_LOGGING_FORMAT").or_else(|| read_env("KUDOS_LOG_FORMAT"));
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
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = secret_value(slack_app_token);
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(official_channel_id) = overrides.official_channel_id {
            self.kudos.official_channel_id = official_channel_id;
        }
        if let Some(monthly_limit) = overrides.monthly_limit {
            self.kudos.monthly_limit = monthly_limit;
        }
        if let Some(health_check_port) = overrides.health_check_port {
            self.server.health_check_port = health_check_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_slack(&self.slack)?;
        validate_kudos(&self.kudos)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("kudos.toml"), PathBuf::from("config/kudos.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if database.url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database.url is required. Set KUDOS_DATABASE_URL (or MONGO_URI) to the store connection string"
                .to_string(),
        ));
    }

    let Some(backend) = database.backend() else {
        return Err(ConfigError::Validation(
            "database.url must be a MongoDB (`mongodb://`, `mongodb+srv://`) or sqlite (`sqlite:...`) URL"
                .to_string(),
        ));
    };

    if backend == DatabaseBackend::Mongo {
        if database.name.trim().is_empty() {
            return Err(ConfigError::Validation("database.name must not be empty".to_string()));
        }
        if database.collection.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.collection must not be empty".to_string(),
            ));
        }
    }

    if let Some(ca_file) = &database.ca_file {
        if !ca_file.exists() {
            return Err(ConfigError::Validation(format!(
                "database.ca_file `{}` does not exist",
                ca_file.display()
            )));
        }
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let app_token = slack.app_token.expose_secret();
    if app_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.app_token is required. Get it from https://api.slack.com/apps > Your App > Basic Information > App-Level Tokens".to_string()
        ));
    }
    if !app_token.starts_with("xapp-") {
        let hint = if app_token.starts_with("xoxb-") {
            " (hint: you may have used the bot token instead of the app token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.app_token must start with `xapp-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    if !is_http_url(&slack.api_base_url) {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_kudos(kudos: &KudosConfig) -> Result<(), ConfigError> {
    if kudos.official_channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "kudos.official_channel_id must name the channel that receives announcements"
                .to_string(),
        ));
    }

    if kudos.monthly_limit == 0 {
        return Err(ConfigError::Validation(
            "kudos.monthly_limit must be greater than zero".to_string(),
        ));
    }

    if !is_http_url(&kudos.default_avatar_url) {
        return Err(ConfigError::Validation(
            "kudos.default_avatar_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    slack: Option<SlackPatch>,
    kudos: Option<KudosPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    ca_file: Option<PathBuf>,
    name: Option<String>,
    collection: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KudosPatch {
    official_channel_id: Option<String>,
    monthly_limit: Option<u32>,
    default_avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
