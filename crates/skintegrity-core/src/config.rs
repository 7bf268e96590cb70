//! Configuration module
//!
//! Settings for the API server, the storage backends, the result database and
//! the client-side poller, loaded from environment variables.

use std::env;
use std::str::FromStr;

use crate::constants::DEFAULT_STORAGE_KEY_PREFIX;
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 3000;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const INFERENCE_TIMEOUT_SECS: u64 = 55;
const POLL_RELAY_TIMEOUT_SECS: u64 = 10;
const DB_MAX_CONNECTIONS: u32 = 5;
const DB_TIMEOUT_SECS: u64 = 30;
const MAX_VIDEO_SIZE_MB: usize = 100;
const POLL_MAX_ATTEMPTS: u32 = 120;
const POLL_INTERVAL_SECS: u64 = 7;
const POLL_INITIAL_DELAY_SECS: u64 = 10;
const DEFAULT_SCANNER_API_URL: &str = "http://localhost:3000";

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key = key, value = %raw, "Ignoring malformed configuration value");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_list(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Megabytes to bytes, rejecting values that do not fit in `usize`.
fn megabytes_to_bytes(key: &str, megabytes: usize) -> Result<usize, anyhow::Error> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {}", key, megabytes))
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub request_timeout_secs: u64,
}

/// Scanner configuration: inference upstream, storage, result database, poller.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    pub base: BaseConfig,
    // Inference service
    pub inference_endpoint: Option<String>,
    pub inference_timeout_secs: u64,
    pub poll_relay_timeout_secs: u64,
    /// Hosts the poll relay may contact. `None` means "the inference endpoint host only".
    pub poll_url_allowlist: Option<Vec<String>>,
    // Result database
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub storage_key_prefix: String,
    // Upload validation
    pub max_video_size_bytes: usize,
    pub video_allowed_extensions: Vec<String>,
    pub video_allowed_content_types: Vec<String>,
    // Poller
    pub poll_max_attempts: u32,
    pub poll_interval_secs: u64,
    pub poll_initial_delay_secs: u64,
    pub poll_delay_per_mb_ms: u64,
    // Client
    pub scanner_api_url: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                request_timeout_secs: REQUEST_TIMEOUT_SECS,
            },
            inference_endpoint: None,
            inference_timeout_secs: INFERENCE_TIMEOUT_SECS,
            poll_relay_timeout_secs: POLL_RELAY_TIMEOUT_SECS,
            poll_url_allowlist: None,
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECS,
            storage_backend: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
            video_allowed_extensions: ["mp4", "mov", "avi", "webm", "mkv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            video_allowed_content_types: [
                "video/mp4",
                "video/quicktime",
                "video/x-msvideo",
                "video/webm",
                "video/x-matroska",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            poll_max_attempts: POLL_MAX_ATTEMPTS,
            poll_interval_secs: POLL_INTERVAL_SECS,
            poll_initial_delay_secs: POLL_INITIAL_DELAY_SECS,
            poll_delay_per_mb_ms: 0,
            scanner_api_url: DEFAULT_SCANNER_API_URL.to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();

        let defaults = ScannerConfig::default();

        let base = BaseConfig {
            server_port: env_parse("SERVER_PORT", SERVER_PORT),
            cors_origins: env_list("CORS_ORIGINS", "*"),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS),
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(raw) => Some(raw.parse::<StorageBackend>()?),
            None => None,
        };

        let max_video_size_bytes = megabytes_to_bytes(
            "MAX_VIDEO_SIZE_MB",
            env_parse("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB),
        )?;

        let config = ScannerConfig {
            base,
            inference_endpoint: env_opt("INFERENCE_ENDPOINT"),
            inference_timeout_secs: env_parse("INFERENCE_TIMEOUT_SECS", INFERENCE_TIMEOUT_SECS),
            poll_relay_timeout_secs: env_parse("POLL_RELAY_TIMEOUT_SECS", POLL_RELAY_TIMEOUT_SECS),
            poll_url_allowlist: env_opt("POLL_URL_ALLOWLIST").map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DB_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            storage_key_prefix: env_opt("STORAGE_KEY_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(defaults.storage_key_prefix),
            max_video_size_bytes,
            video_allowed_extensions: env_list(
                "VIDEO_ALLOWED_EXTENSIONS",
                &defaults.video_allowed_extensions.join(","),
            ),
            video_allowed_content_types: env_list(
                "VIDEO_ALLOWED_CONTENT_TYPES",
                &defaults.video_allowed_content_types.join(","),
            ),
            poll_max_attempts: env_parse("POLL_MAX_ATTEMPTS", POLL_MAX_ATTEMPTS),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS),
            poll_initial_delay_secs: env_parse("POLL_INITIAL_DELAY_SECS", POLL_INITIAL_DELAY_SECS),
            poll_delay_per_mb_ms: env_parse("POLL_DELAY_PER_MB_MS", 0),
            scanner_api_url: env::var("SCANNER_API_URL")
                .unwrap_or_else(|_| DEFAULT_SCANNER_API_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that hold for every binary, whichever subsystems it uses.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(ref endpoint) = self.inference_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "INFERENCE_ENDPOINT must be an http:// or https:// URL"
                ));
            }
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!("POLL_MAX_ATTEMPTS must be at least 1"));
        }

        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be at least 1"));
        }

        if self.video_allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.storage_key_prefix.contains("..") {
            return Err(anyhow::anyhow!("STORAGE_KEY_PREFIX must not contain '..'"));
        }

        Ok(())
    }

    /// Checks required before the API server can forward to the inference service.
    pub fn validate_for_api(&self) -> Result<(), anyhow::Error> {
        if self.inference_endpoint.is_none() {
            return Err(anyhow::anyhow!(
                "INFERENCE_ENDPOINT must be set to run the API server"
            ));
        }
        Ok(())
    }

    /// Checks required before a storage backend can be constructed.
    pub fn validate_storage(&self) -> Result<(), anyhow::Error> {
        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ScannerConfig>);

impl Config {
    fn inner(&self) -> &ScannerConfig {
        &self.0
    }

    pub fn new(config: ScannerConfig) -> Self {
        Config(Box::new(config))
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ScannerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn validate_for_api(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()?;
        self.inner().validate_for_api()
    }

    pub fn validate_storage(&self) -> Result<(), anyhow::Error> {
        self.inner().validate_storage()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().base.request_timeout_secs
    }

    pub fn inference_endpoint(&self) -> Option<&str> {
        self.inner().inference_endpoint.as_deref()
    }

    pub fn inference_timeout_secs(&self) -> u64 {
        self.inner().inference_timeout_secs
    }

    pub fn poll_relay_timeout_secs(&self) -> u64 {
        self.inner().poll_relay_timeout_secs
    }

    pub fn poll_url_allowlist(&self) -> Option<&[String]> {
        self.inner().poll_url_allowlist.as_deref()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn storage_key_prefix(&self) -> &str {
        &self.inner().storage_key_prefix
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.inner().max_video_size_bytes
    }

    pub fn video_allowed_extensions(&self) -> &[String] {
        &self.inner().video_allowed_extensions
    }

    pub fn video_allowed_content_types(&self) -> &[String] {
        &self.inner().video_allowed_content_types
    }

    pub fn poll_max_attempts(&self) -> u32 {
        self.inner().poll_max_attempts
    }

    pub fn poll_interval_secs(&self) -> u64 {
        self.inner().poll_interval_secs
    }

    pub fn poll_initial_delay_secs(&self) -> u64 {
        self.inner().poll_initial_delay_secs
    }

    pub fn poll_delay_per_mb_ms(&self) -> u64 {
        self.inner().poll_delay_per_mb_ms
    }

    pub fn scanner_api_url(&self) -> &str {
        &self.inner().scanner_api_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_max_attempts, 120);
        assert_eq!(config.poll_interval_secs, 7);
        assert_eq!(config.max_video_size_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_video_size_limit_overflow_is_an_error() {
        assert_eq!(megabytes_to_bytes("MAX_VIDEO_SIZE_MB", 2).unwrap(), 2 * 1024 * 1024);
        let err = megabytes_to_bytes("MAX_VIDEO_SIZE_MB", usize::MAX).unwrap_err();
        assert!(err.to_string().contains("MAX_VIDEO_SIZE_MB is too large"));
    }

    #[test]
    fn test_api_requires_inference_endpoint() {
        let config = Config::new(ScannerConfig::default());
        assert!(config.validate_for_api().is_err());

        let config = Config::new(ScannerConfig {
            inference_endpoint: Some("https://inference.example.com/run".to_string()),
            ..ScannerConfig::default()
        });
        assert!(config.validate_for_api().is_ok());
    }

    #[test]
    fn test_rejects_non_http_inference_endpoint() {
        let config = ScannerConfig {
            inference_endpoint: Some("ftp://inference.example.com".to_string()),
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_poll_attempts() {
        let config = ScannerConfig {
            poll_max_attempts: 0,
            ..ScannerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_validation_per_backend() {
        let s3_missing_bucket = ScannerConfig::default();
        assert!(s3_missing_bucket.validate_storage().is_err());

        let s3 = ScannerConfig {
            s3_bucket: Some("videos".to_string()),
            aws_region: Some("us-east-1".to_string()),
            ..ScannerConfig::default()
        };
        assert!(s3.validate_storage().is_ok());

        let local_missing_url = ScannerConfig {
            storage_backend: Some(StorageBackend::Local),
            local_storage_path: Some("/tmp/videos".to_string()),
            ..ScannerConfig::default()
        };
        assert!(local_missing_url.validate_storage().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut inner = ScannerConfig::default();
        inner.base.environment = "Prod".to_string();
        assert!(Config::new(inner).is_production());
        assert!(!Config::new(ScannerConfig::default()).is_production());
    }
}
