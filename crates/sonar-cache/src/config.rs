//! Cache configuration.

use std::time::Duration;

/// Which store backs the analysis cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Redis,
    /// Process-local store, for development and tests
    Memory,
}

impl CacheBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis URL
    pub redis_url: String,
    /// Value for Redis `maxmemory`
    pub max_memory: String,
    /// Value for Redis `maxmemory-policy`
    pub eviction_policy: String,
    /// Bound on the initial connect and PING
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            max_memory: "256mb".to_string(),
            eviction_policy: "allkeys-lru".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: std::env::var("CACHE_BACKEND")
                .ok()
                .and_then(|s| CacheBackend::parse(&s))
                .unwrap_or(defaults.backend),
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            max_memory: std::env::var("CACHE_MAX_MEMORY").unwrap_or(defaults.max_memory),
            eviction_policy: std::env::var("CACHE_POLICY").unwrap_or(defaults.eviction_policy),
            connect_timeout: std::env::var("CACHE_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(CacheBackend::parse("redis"), Some(CacheBackend::Redis));
        assert_eq!(CacheBackend::parse(" Memory "), Some(CacheBackend::Memory));
        assert_eq!(CacheBackend::parse("memcached"), None);
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.max_memory, "256mb");
        assert_eq!(config.eviction_policy, "allkeys-lru");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }
}
