//! API and analyzer configuration.

use std::path::PathBuf;
use std::time::Duration;

use sonar_media::DownloadConfig;

/// Read and parse an environment variable, `None` when unset or malformed.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

/// Analysis pipeline configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Overall download timeout
    pub download_timeout: Duration,
    /// Download connect timeout
    pub connect_timeout: Duration,
    /// Largest accepted download in bytes
    pub max_file_size: u64,
    /// Longest accepted audio in seconds
    pub max_duration: f64,
    /// Cache entry lifetime in seconds
    pub cache_ttl: u64,
    /// Directory for downloaded files
    pub temp_dir: PathBuf,
    /// CPU-bound analyses allowed at once
    pub max_concurrent_analyses: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            download_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_file_size: 50 * 1024 * 1024, // 50MB
            max_duration: 600.0,
            cache_ttl: 3600,
            temp_dir: std::env::temp_dir(),
            max_concurrent_analyses: 4,
        }
    }
}

impl AnalyzerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            download_timeout: env_parse("DOWNLOAD_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            connect_timeout: env_parse("DOWNLOAD_CONNECT_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            max_file_size: env_parse("MAX_FILE_SIZE").unwrap_or(defaults.max_file_size),
            max_duration: env_parse::<f64>("MAX_DURATION")
                .filter(|d| *d > 0.0)
                .unwrap_or(defaults.max_duration),
            cache_ttl: env_parse::<u64>("CACHE_TTL")
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.cache_ttl),
            temp_dir: std::env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            max_concurrent_analyses: env_parse::<usize>("MAX_CONCURRENT_ANALYSES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_analyses),
        }
    }

    /// Downloader settings derived from this config.
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            timeout: self.download_timeout,
            connect_timeout: self.connect_timeout,
            max_file_size: self.max_file_size,
            temp_dir: self.temp_dir.clone(),
        }
    }
}
