// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the auth service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth_server_addr: String,
    pub registrar_key: String,  // Pre-shared key for minting registration codes
    pub admin_password: Option<String>,

    pub password_hash: PasswordHashConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

/// Argon2 work factor
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot of users and registration codes. `None` keeps everything in memory.
    pub snapshot_path: Option<String>,
    pub flush_interval_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub paths: Vec<String>,
    pub max_requests: usize,
    pub window_secs: u64,
    /// Reverse proxies whose `Forwarded` / `X-Forwarded-For` headers are believed
    pub trusted_proxies: Vec<String>,
}

/// Registrar key shipped in the defaults. Only accepted in development.
pub const DEV_REGISTRAR_KEY: &str = "dev_registrar_key";
/// Run mode when `RUN_MODE` is unset
pub const DEFAULT_RUN_MODE: &str = "development";

/// Current `RUN_MODE`, defaulting to development
pub fn run_mode() -> String {
    env::var("RUN_MODE").unwrap_or_else(|_| DEFAULT_RUN_MODE.into())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("registrar_key must not be empty")]
    EmptyRegistrarKey,
    #[error("password_hash.{0} must be greater than zero")]
    ZeroWorkFactor(&'static str),
    #[error("password_hash.memory_kib must be at least 8 * parallelism ({0})")]
    MemoryTooSmall(u32),
    #[error("registrar_key is the built-in development key; set a secret for run mode {0:?}")]
    DefaultRegistrarKey(String),
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroRateLimitWindow,
    #[error("storage.flush_interval_secs must be greater than zero")]
    ZeroFlushInterval,
    #[error("rate_limit.trusted_proxies entry {0:?} is not an IP address")]
    InvalidTrustedProxy(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_server_addr: "127.0.0.1:8082".to_string(),
            registrar_key: DEV_REGISTRAR_KEY.to_string(),
            admin_password: None,
            password_hash: PasswordHashConfig::default(),
            storage: StorageConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for PasswordHashConfig {
    // OWASP minimum for Argon2id: 19 MiB, 2 iterations, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            flush_interval_secs: 30,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: vec![
                "/login".to_string(),
                "/invite".to_string(),
                "/register".to_string(),
            ],
            max_requests: 10,
            window_secs: 60,
            trusted_proxies: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = run_mode();

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Environment variables with prefix "APP", e.g. APP__STORAGE__SNAPSHOT_PATH
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files and environment, falling back to flat environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_flat_env()
            }
        }
    }

    fn from_flat_env() -> Self {
        let defaults = Self::default();

        let auth_server_addr = env::var("AUTH_SERVER_ADDR")
            .unwrap_or(defaults.auth_server_addr);

        let registrar_key = env::var("REGISTRAR_KEY")
            .unwrap_or(defaults.registrar_key);

        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let snapshot_path = env::var("SNAPSHOT_PATH").ok();

        let flush_interval_secs = env::var("SNAPSHOT_FLUSH_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.storage.flush_interval_secs);

        let rate_limit_enabled = env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(defaults.rate_limit.enabled);

        let max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.rate_limit.max_requests);

        Self {
            auth_server_addr,
            registrar_key,
            admin_password,
            password_hash: defaults.password_hash,
            storage: StorageConfig {
                snapshot_path,
                flush_interval_secs,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                max_requests,
                ..defaults.rate_limit
            },
        }
    }

    /// Reject settings the service cannot start with in the current `RUN_MODE`
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.validate_for(&run_mode())
    }

    pub fn validate_for(&self, run_mode: &str) -> Result<(), ConfigValidationError> {
        if self.registrar_key.trim().is_empty() {
            return Err(ConfigValidationError::EmptyRegistrarKey);
        }
        if self.registrar_key == DEV_REGISTRAR_KEY {
            if run_mode != DEFAULT_RUN_MODE {
                return Err(ConfigValidationError::DefaultRegistrarKey(run_mode.to_string()));
            }
            tracing::warn!("Using the built-in development registrar key");
        }

        let hash = &self.password_hash;
        if hash.iterations == 0 {
            return Err(ConfigValidationError::ZeroWorkFactor("iterations"));
        }
        if hash.parallelism == 0 {
            return Err(ConfigValidationError::ZeroWorkFactor("parallelism"));
        }
        if hash.memory_kib < 8 * hash.parallelism {
            return Err(ConfigValidationError::MemoryTooSmall(8 * hash.parallelism));
        }

        if self.storage.flush_interval_secs == 0 {
            return Err(ConfigValidationError::ZeroFlushInterval);
        }

        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            return Err(ConfigValidationError::ZeroRateLimitWindow);
        }
        if let Some(bad) = self
            .rate_limit
            .trusted_proxies
            .iter()
            .find(|proxy| proxy.parse::<IpAddr>().is_err())
        {
            return Err(ConfigValidationError::InvalidTrustedProxy(bad.clone()));
        }

        Ok(())
    }
}
