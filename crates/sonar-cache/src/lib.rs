//! URL-keyed cache for analysis results.
//!
//! This crate provides:
//! - Deterministic cache keys derived from the audio URL
//! - A `CacheStore` seam with Redis and in-memory implementations
//! - `AnalysisCache`, a soft-fail facade that never errors to callers

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

use std::sync::Arc;

use tracing::warn;

pub use cache::{cache_key, AnalysisCache, LookupOutcome, KEY_LEN, KEY_PREFIX};
pub use config::{CacheBackend, CacheConfig};
pub use error::{CacheError, CacheResult};
pub use store::{CacheStore, InMemoryStore, RedisStore};

/// Build the cache selected by `config` and connect it.
///
/// A Redis server that cannot be reached is logged and the returned cache
/// stays disconnected, so lookups miss and stores are skipped. Only an
/// unparseable Redis URL is an error.
pub async fn connect_cache(config: &CacheConfig) -> CacheResult<AnalysisCache> {
    match config.backend {
        CacheBackend::Memory => Ok(AnalysisCache::new(Arc::new(InMemoryStore::new()))),
        CacheBackend::Redis => {
            let store = RedisStore::new(config.clone())?;
            if let Err(e) = store.connect().await {
                warn!(error = %e, "Redis unavailable, running without cache");
            }
            Ok(AnalysisCache::new(Arc::new(store)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_connected() {
        let config = CacheConfig {
            backend: CacheBackend::Memory,
            ..CacheConfig::default()
        };
        let cache = connect_cache(&config).await.unwrap();
        assert!(cache.is_connected());
        assert!(cache.ping().await);

        cache.close().await;
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_redis_degrades_to_disconnected() {
        // Nothing listens on port 1
        let config = CacheConfig {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:1".to_string(),
            ..CacheConfig::default()
        };
        let cache = connect_cache(&config).await.unwrap();
        assert!(!cache.is_connected());
        assert_eq!(cache.lookup("https://example.com/a.mp3").await, None);
    }
}
