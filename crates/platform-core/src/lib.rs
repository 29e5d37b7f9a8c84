use serde::{Deserialize, Serialize, Serializer};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnv {
    Local,
    Dev,
    Test,
    Prod,
}

impl AppEnv {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }
}

impl std::str::FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" | "development" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(ConfigError::InvalidEnv(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ConfigError::InvalidStorageBackend(other.to_string())),
        }
    }
}

/// Shared secret issued to the bot by the messaging platform. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_tuple("BotToken").field(&state).finish()
    }
}

impl Serialize for BotToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub auth: AuthSection,
    pub storage: StorageSection,
    pub leaderboard: LeaderboardSection,
    pub observability: ObservabilitySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub env: AppEnv,
    pub service_name: String,
    pub http_bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    pub bot_token: BotToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeaderboardSection {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySection {
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RequestInvalid,
    Unauthorized,
    StoreUnavailable,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestInvalid => "REQUEST_INVALID",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid APP_ENV value: {0}")]
    InvalidEnv(String),
    #[error("invalid storage backend: {0}")]
    InvalidStorageBackend(String),
    #[error("invalid numeric value for {key}: {value}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("postgres storage requires storage.database_url or DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("leaderboard.default_limit must be between 1 and leaderboard.max_limit")]
    InvalidLeaderboardLimits,
    #[error("unable to locate config directory (expected config/default.toml)")]
    ConfigDirNotFound,
    #[error("failed reading config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing config file {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct PartialAppConfig {
    app: Option<PartialAppSection>,
    auth: Option<PartialAuthSection>,
    storage: Option<PartialStorageSection>,
    leaderboard: Option<PartialLeaderboardSection>,
    observability: Option<PartialObservabilitySection>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialAppSection {
    env: Option<AppEnv>,
    service_name: Option<String>,
    http_bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialAuthSection {
    bot_token: Option<BotToken>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialStorageSection {
    backend: Option<StorageBackend>,
    database_url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLeaderboardSection {
    default_limit: Option<usize>,
    max_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialObservabilitySection {
    log_filter: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let app_env = env::var("APP_ENV")
            .ok()
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(AppEnv::Local);
        let config_dir = resolve_config_dir()?;
        Self::load_from_dir_for_env(config_dir, app_env)
    }

    pub fn load_from_dir_for_env(
        config_dir: impl AsRef<Path>,
        app_env: AppEnv,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let mut config = Self::default_for_env(app_env);
        merge_file(&mut config, &config_dir.join("default.toml"))?;
        let env_file = config_dir.join(format!("{}.toml", app_env.as_str()));
        if env_file.exists() {
            merge_file(&mut config, &env_file)?;
        }
        config.app.env = app_env;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn default_for_env(app_env: AppEnv) -> Self {
        Self {
            app: AppSection {
                env: app_env,
                service_name: "pet-wars".to_string(),
                http_bind_addr: "127.0.0.1:8080".to_string(),
            },
            auth: AuthSection {
                bot_token: BotToken::default(),
            },
            storage: StorageSection {
                backend: StorageBackend::Memory,
                database_url: None,
                max_connections: 5,
            },
            leaderboard: LeaderboardSection {
                default_limit: 10,
                max_limit: 100,
            },
            observability: ObservabilitySection {
                log_filter: "info".to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres
            && self
                .storage
                .database_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.leaderboard.default_limit == 0
            || self.leaderboard.default_limit > self.leaderboard.max_limit
        {
            return Err(ConfigError::InvalidLeaderboardLimits);
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(raw_env) = env::var("APP_ENV") {
            self.app.env = raw_env.parse()?;
        }
        if let Ok(service_name) = env::var("PET_WARS__SERVICE_NAME") {
            self.app.service_name = service_name;
        }
        if let Ok(bind_addr) = env::var("PET_WARS__HTTP_BIND_ADDR") {
            self.app.http_bind_addr = bind_addr;
        }
        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            self.auth.bot_token = BotToken::new(token);
        }
        if let Ok(backend) = env::var("PET_WARS__STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.storage.database_url = Some(url);
        }
        if let Ok(raw) = env::var("PET_WARS__DB_MAX_CONNECTIONS") {
            self.storage.max_connections =
                raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    key: "PET_WARS__DB_MAX_CONNECTIONS",
                    value: raw.clone(),
                })?;
        }
        if let Ok(log_filter) = env::var("OBSERVABILITY__LOG_FILTER") {
            self.observability.log_filter = log_filter;
        } else if let Ok(log_filter) = env::var("RUST_LOG") {
            self.observability.log_filter = log_filter;
        }
        Ok(())
    }

    fn merge_partial(&mut self, partial: PartialAppConfig) {
        if let Some(app) = partial.app {
            if let Some(value) = app.env {
                self.app.env = value;
            }
            if let Some(value) = app.service_name {
                self.app.service_name = value;
            }
            if let Some(value) = app.http_bind_addr {
                self.app.http_bind_addr = value;
            }
        }
        if let Some(auth) = partial.auth {
            if let Some(value) = auth.bot_token {
                self.auth.bot_token = value;
            }
        }
        if let Some(storage) = partial.storage {
            if let Some(value) = storage.backend {
                self.storage.backend = value;
            }
            if let Some(value) = storage.database_url {
                self.storage.database_url = Some(value);
            }
            if let Some(value) = storage.max_connections {
                self.storage.max_connections = value;
            }
        }
        if let Some(leaderboard) = partial.leaderboard {
            if let Some(value) = leaderboard.default_limit {
                self.leaderboard.default_limit = value;
            }
            if let Some(value) = leaderboard.max_limit {
                self.leaderboard.max_limit = value;
            }
        }
        if let Some(observability) = partial.observability {
            if let Some(value) = observability.log_filter {
                self.observability.log_filter = value;
            }
        }
    }
}

fn merge_file(config: &mut AppConfig, path: &Path) -> Result<(), ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let partial =
        toml::from_str::<PartialAppConfig>(&content).map_err(|source| ConfigError::ParseToml {
            path: path.display().to_string(),
            source,
        })?;
    config.merge_partial(partial);
    Ok(())
}

fn resolve_config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var("PET_WARS_CONFIG_DIR") {
        return Ok(PathBuf::from(path));
    }

    let mut current_dir = env::current_dir().map_err(|_| ConfigError::ConfigDirNotFound)?;
    loop {
        let candidate = current_dir.join("config");
        if candidate.join("default.toml").exists() {
            return Ok(candidate);
        }
        if !current_dir.pop() {
            break;
        }
    }

    Err(ConfigError::ConfigDirNotFound)
}
