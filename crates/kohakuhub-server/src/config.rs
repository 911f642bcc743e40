//! # Server Configuration
//!
//! Production-grade configuration management with:
//!
//! - Environment variable support (12-factor app)
//! - Configuration file loading (YAML)
//! - Comprehensive validation
//! - Sensible defaults
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KOHAKUHUB_API_ADDR` | HTTP API listen address | `127.0.0.1:8080` |
//! | `KOHAKUHUB_BASE_URL` | Public base URL used in response bodies | `http://localhost:8080` |
//! | `KOHAKUHUB_METRICS_ADDR` | Metrics endpoint | `0.0.0.0:9090` |
//! | `KOHAKUHUB_LOG_LEVEL` | Log level | `info` |
//! | `KOHAKUHUB_LOG_FORMAT` | Log format (json/pretty) | `json` |
//! | `KOHAKUHUB_DATABASE_URL` | Postgres connection string | *required* |
//! | `KOHAKUHUB_S3_ENDPOINT` | S3-compatible endpoint | *required* |
//! | `KOHAKUHUB_S3_PUBLIC_ENDPOINT` | Endpoint embedded in presigned URLs | falls back to `S3_ENDPOINT` |
//! | `KOHAKUHUB_S3_BUCKET` | Blob storage bucket | `kohakuhub` |
//! | `KOHAKUHUB_S3_ACCESS_KEY` / `KOHAKUHUB_S3_SECRET_KEY` | S3 credentials | *required* |
//! | `KOHAKUHUB_VSTORE_ENDPOINT` | Versioned-store bridge endpoint | *optional, in-memory if unset* |
//! | `KOHAKUHUB_SESSION_SECRET` | HMAC secret for session cookies | *required* |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kohakuhub_server::config::NodeConfig;
//!
//! let config = NodeConfig::from_env().expect("Invalid configuration");
//! config.validate_config().expect("Configuration validation failed");
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use validator::Validate;

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// Environment variable parsing error.
    #[error("Failed to parse environment variable {key}: {message}")]
    EnvParse { key: String, message: String },

    /// File loading error.
    #[error("Failed to load configuration file: {0}")]
    FileLoad(String),

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main node configuration (spec §6 "CLI / env").
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NodeConfig {
    /// HTTP API configuration.
    #[validate(nested)]
    #[serde(default)]
    pub api: ApiConfig,

    /// Metrics configuration.
    #[validate(nested)]
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[validate(nested)]
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database configuration.
    #[validate(nested)]
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object store (S3-compatible blob store) configuration.
    #[validate(nested)]
    #[serde(default)]
    pub storage: StorageConfig,

    /// Versioned-store bridge configuration.
    #[validate(nested)]
    #[serde(default)]
    pub vstore: VstoreConfig,

    /// Hub-level behavior (quotas, LFS thresholds, sessions).
    #[validate(nested)]
    #[serde(default)]
    pub hub: HubSettings,

    /// Resilience configuration.
    #[validate(nested)]
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            vstore: VstoreConfig::default(),
            hub: HubSettings::default(),
            resilience: ResilienceConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables, layered over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileLoad(e.to_string()))?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::FileLoad(e.to_string()))
    }

    /// Merge configuration from environment variables, only overriding
    /// fields that are explicitly set.
    pub fn merge_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("KOHAKUHUB_API_ADDR") {
            self.api.addr = addr.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_API_ADDR".to_string(),
                message: "invalid socket address".to_string(),
            })?;
        }
        if let Ok(url) = std::env::var("KOHAKUHUB_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("KOHAKUHUB_REQUEST_TIMEOUT") {
            self.api.request_timeout_secs = timeout.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_REQUEST_TIMEOUT".to_string(),
                message: "invalid timeout value".to_string(),
            })?;
        }

        if let Ok(addr) = std::env::var("KOHAKUHUB_METRICS_ADDR") {
            self.metrics.addr = addr.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_METRICS_ADDR".to_string(),
                message: "invalid socket address".to_string(),
            })?;
        }
        if let Ok(enabled) = std::env::var("KOHAKUHUB_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(true);
        }

        if let Ok(level) = std::env::var("KOHAKUHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("KOHAKUHUB_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(url) = std::env::var("KOHAKUHUB_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(max) = std::env::var("KOHAKUHUB_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_DATABASE_MAX_CONNECTIONS".to_string(),
                message: "invalid integer".to_string(),
            })?;
        }

        if let Ok(endpoint) = std::env::var("KOHAKUHUB_S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Ok(endpoint) = std::env::var("KOHAKUHUB_S3_PUBLIC_ENDPOINT") {
            self.storage.public_endpoint = Some(endpoint);
        }
        if let Ok(bucket) = std::env::var("KOHAKUHUB_S3_BUCKET") {
            self.storage.bucket = bucket;
        }
        if let Ok(key) = std::env::var("KOHAKUHUB_S3_ACCESS_KEY") {
            self.storage.access_key = Some(key);
        }
        if let Ok(key) = std::env::var("KOHAKUHUB_S3_SECRET_KEY") {
            self.storage.secret_key = Some(key);
        }
        if let Ok(region) = std::env::var("KOHAKUHUB_S3_REGION") {
            self.storage.region = region;
        }

        if let Ok(endpoint) = std::env::var("KOHAKUHUB_VSTORE_ENDPOINT") {
            self.vstore.endpoint = Some(endpoint);
        }
        if let Ok(creds) = std::env::var("KOHAKUHUB_VSTORE_CREDENTIALS") {
            self.vstore.credentials = Some(creds);
        }

        if let Ok(secret) = std::env::var("KOHAKUHUB_SESSION_SECRET") {
            self.hub.session_secret = Some(secret);
        }
        if let Ok(bytes) = std::env::var("KOHAKUHUB_LFS_THRESHOLD_BYTES") {
            self.hub.lfs_threshold_bytes = bytes.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_LFS_THRESHOLD_BYTES".to_string(),
                message: "invalid integer".to_string(),
            })?;
        }
        if let Ok(versions) = std::env::var("KOHAKUHUB_LFS_KEEP_VERSIONS") {
            self.hub.lfs_keep_versions = versions.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_LFS_KEEP_VERSIONS".to_string(),
                message: "invalid integer".to_string(),
            })?;
        }
        if let Ok(enabled) = std::env::var("KOHAKUHUB_LFS_AUTO_GC") {
            self.hub.lfs_auto_gc = enabled.parse().unwrap_or(true);
        }
        if let Ok(quota) = std::env::var("KOHAKUHUB_DEFAULT_QUOTA_BYTES") {
            self.hub.default_quota_bytes = Some(quota.parse().map_err(|_| ConfigError::EnvParse {
                key: "KOHAKUHUB_DEFAULT_QUOTA_BYTES".to_string(),
                message: "invalid integer".to_string(),
            })?);
        }

        Ok(())
    }

    /// Validate the configuration, including fields `validator` can't
    /// express (required-unless-testing secrets).
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.database.url.is_none() {
            return Err(ConfigError::Missing("database.url (KOHAKUHUB_DATABASE_URL)".to_string()));
        }
        if self.storage.endpoint.is_none() {
            return Err(ConfigError::Missing("storage.endpoint (KOHAKUHUB_S3_ENDPOINT)".to_string()));
        }
        if self.hub.session_secret.is_none() {
            return Err(ConfigError::Missing("hub.session_secret (KOHAKUHUB_SESSION_SECRET)".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log format '{}'. Valid values: {:?}",
                self.logging.format, valid_formats
            )));
        }

        Ok(())
    }
}

/// API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ApiConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// Public base URL embedded in response bodies (`url`, `commitUrl`, …).
    pub base_url: String,

    /// Request timeout in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub request_timeout_secs: u32,

    /// Maximum request body size in bytes.
    #[validate(range(min = 1024, max = 104_857_600))]
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".parse().expect("valid default address"),
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 50 * 1024 * 1024,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Metrics endpoint address.
    pub addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true, addr: "0.0.0.0:9090".parse().expect("valid default address") }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (json, pretty).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "json".to_string() }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct DatabaseConfig {
    /// Postgres connection string.
    pub url: Option<String>,

    /// Pool size.
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// S3-compatible blob store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StorageConfig {
    /// S3 endpoint the server talks to.
    pub endpoint: Option<String>,

    /// Endpoint embedded in presigned URLs, when different from
    /// `endpoint` (e.g. an internal vs. public-facing hostname).
    pub public_endpoint: Option<String>,

    /// Bucket name.
    pub bucket: String,

    /// Access key.
    pub access_key: Option<String>,

    /// Secret key.
    pub secret_key: Option<String>,

    /// Region.
    pub region: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            public_endpoint: None,
            bucket: "kohakuhub".to_string(),
            access_key: None,
            secret_key: None,
            region: "us-east-1".to_string(),
        }
    }
}

/// Versioned-store bridge configuration (spec §4.7).
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct VstoreConfig {
    /// Endpoint of an external versioned-store bridge service. When
    /// unset, the server falls back to an in-process, non-durable store
    /// suitable only for development and tests.
    pub endpoint: Option<String>,

    /// Credentials for the above, opaque to this crate.
    pub credentials: Option<String>,
}

/// Hub-wide behavior settings, handed to `kohakuhub-api`'s `HubConfig`.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct HubSettings {
    /// HMAC secret used to sign session cookies.
    pub session_secret: Option<String>,

    /// Default per-namespace quota for namespaces with no explicit override.
    pub default_quota_bytes: Option<i64>,

    /// File size, in bytes, above which a write is routed to LFS absent a
    /// repo-level override.
    pub lfs_threshold_bytes: i64,

    /// How many historical LFS object versions per path survive GC.
    #[validate(range(min = 1, max = 1000))]
    pub lfs_keep_versions: u32,

    /// Whether a commit triggers inline LFS GC after writing.
    pub lfs_auto_gc: bool,

    /// Chunk size used when a large LFS upload is split into multipart parts.
    pub lfs_chunk_size: u64,

    /// Validity window for presigned blob URLs, in seconds.
    #[validate(range(min = 60, max = 604_800))]
    pub presign_expiry_secs: u64,

    /// Validity window for a freshly created session cookie, in seconds.
    #[validate(range(min = 60))]
    pub session_ttl_secs: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            session_secret: None,
            default_quota_bytes: None,
            lfs_threshold_bytes: 10_000_000,
            lfs_keep_versions: 5,
            lfs_auto_gc: true,
            lfs_chunk_size: 64 * 1024 * 1024,
            presign_expiry_secs: 3600,
            session_ttl_secs: 60 * 60 * 24 * 30,
        }
    }
}

impl HubSettings {
    /// Builds the `kohakuhub-api` runtime config from these settings.
    pub fn to_hub_config(&self) -> kohakuhub_api::HubConfig {
        kohakuhub_api::HubConfig {
            base_url: String::new(), // overwritten by ApiConfig::base_url at call site
            default_quota_bytes: self.default_quota_bytes,
            lfs_threshold_bytes: self.lfs_threshold_bytes,
            lfs_keep_versions: self.lfs_keep_versions,
            lfs_auto_gc: self.lfs_auto_gc,
            lfs_chunk_size: self.lfs_chunk_size,
            presign_expiry: Duration::from_secs(self.presign_expiry_secs),
            session_ttl: Duration::from_secs(self.session_ttl_secs),
        }
    }
}

/// Resilience configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ResilienceConfig {
    /// Retry configuration.
    #[validate(nested)]
    #[serde(default)]
    pub retry: RetryConfig,

    /// Circuit breaker configuration.
    #[validate(nested)]
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RetryConfig {
    /// Maximum retry attempts.
    #[validate(range(min = 0, max = 10))]
    pub max_attempts: u32,

    /// Initial delay in milliseconds.
    #[validate(range(min = 10, max = 60000))]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds.
    #[validate(range(min = 100, max = 300000))]
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay_ms: 100, max_delay_ms: 5000, multiplier: 2.0 }
    }
}

impl RetryConfig {
    /// Convert to `RetryPolicy`.
    pub fn to_policy(&self) -> crate::resilience::RetryPolicy {
        crate::resilience::RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening.
    #[validate(range(min = 1, max = 100))]
    pub failure_threshold: u32,

    /// Number of successes to close from half-open.
    #[validate(range(min = 1, max = 100))]
    pub success_threshold: u32,

    /// Timeout in seconds before transitioning to half-open.
    #[validate(range(min = 1, max = 3600))]
    pub timeout_secs: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, success_threshold: 3, timeout_secs: 30 }
    }
}

impl CircuitBreakerConfig {
    /// Convert to `CircuitBreaker`.
    pub fn to_circuit_breaker(&self) -> crate::resilience::CircuitBreaker {
        crate::resilience::CircuitBreaker::new(
            self.failure_threshold,
            self.success_threshold,
            Duration::from_secs(self.timeout_secs as u64),
        )
    }
}
