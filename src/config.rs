use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "admin-console.toml";

const DEV_SESSION_SECRET: &str = "change-me-please-32-characters";
const MIN_SESSION_SECRET_LEN: usize = 16;

// ──────────────────────────── TOML structure ────────────────────────────

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub drive: DriveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure_cookies: true,
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_true() -> bool {
    true
}
fn default_session_ttl_minutes() -> i64 {
    8 * 60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
        }
    }
}

fn default_app_name() -> String {
    "Vector Store Admin".to_string()
}
fn default_environment() -> String {
    "production".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    #[serde(default = "default_store_name")]
    pub default_store_name: String,
    #[serde(default = "default_ingest_timeout_secs")]
    pub ingest_timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_base: default_openai_api_base(),
            default_store_name: default_store_name(),
            ingest_timeout_secs: default_ingest_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_store_name() -> String {
    "Admin Console Vector Store".to_string()
}
fn default_ingest_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_drive_api_base")]
    pub api_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: default_drive_api_base(),
        }
    }
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

// ──────────────────────────── Resolved Settings ────────────────────────────

/// Flat settings structure resolved from TOML + environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    // Server
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub session_ttl_minutes: i64,

    // Service
    pub app_name: String,
    pub environment: String,

    // Auth
    pub session_secret: String,
    pub admin_username: String,
    pub admin_password_hash: Option<String>,

    // Vector store
    pub vector_store_provider: String,
    pub openai_api_base: String,
    pub openai_api_key: Option<String>,
    pub default_vector_store_id: Option<String>,
    pub default_vector_store_name: String,
    pub ingest_timeout_secs: u64,

    // Drive
    pub drive_api_base: String,
    pub google_service_account_file: Option<PathBuf>,
    pub google_impersonated_user: Option<String>,
}

impl Settings {
    /// Drive features are on only when a service-account file is configured.
    pub fn drive_enabled(&self) -> bool {
        self.google_service_account_file.is_some()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Load settings from a TOML path and the process environment.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    // Load .env if present (ignore errors)
    let _ = dotenvy::dotenv();
    load_settings_with_env(path, |key| std::env::var(key).ok())
}

/// Load settings with an explicit environment lookup. Useful for testing.
pub fn load_settings_with_env(
    path: impl AsRef<Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let path = path.as_ref();
    let config: TomlConfig = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        info!("No config file at {}, using defaults", path.display());
        TomlConfig::default()
    };
    resolve_settings(config, env)
}

/// Merge a parsed TOML config with secrets from the environment.
pub fn resolve_settings(
    config: TomlConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    // Empty variables count as unset.
    let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let environment = config.service.environment;

    let session_secret = match var("SESSION_SECRET") {
        Some(secret) => secret,
        None if environment == "development" => DEV_SESSION_SECRET.to_string(),
        None => anyhow::bail!("SESSION_SECRET environment variable is required"),
    };
    if session_secret.len() < MIN_SESSION_SECRET_LEN {
        anyhow::bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} characters long");
    }

    let provider = config.vector_store.provider;
    if !matches!(provider.as_str(), "openai" | "memory") {
        anyhow::bail!("Unknown vector store provider: {provider}");
    }

    if config.server.session_ttl_minutes <= 0 {
        anyhow::bail!("session_ttl_minutes must be positive");
    }

    Ok(Settings {
        host: config.server.host,
        port: config.server.port,
        secure_cookies: config.server.secure_cookies,
        session_ttl_minutes: config.server.session_ttl_minutes,
        app_name: config.service.app_name,
        environment,
        session_secret,
        admin_username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
        admin_password_hash: var("ADMIN_PASSWORD_HASH"),
        vector_store_provider: provider,
        openai_api_base: config.vector_store.api_base.trim_end_matches('/').to_string(),
        openai_api_key: var("OPENAI_API_KEY"),
        default_vector_store_id: var("OPENAI_VECTOR_STORE_ID"),
        default_vector_store_name: var("OPENAI_VECTOR_STORE_NAME")
            .unwrap_or(config.vector_store.default_store_name),
        ingest_timeout_secs: config.vector_store.ingest_timeout_secs,
        drive_api_base: config.drive.api_base.trim_end_matches('/').to_string(),
        google_service_account_file: var("GOOGLE_SERVICE_ACCOUNT_FILE").map(PathBuf::from),
        google_impersonated_user: var("GOOGLE_IMPERSONATED_USER"),
    })
}
