//! URL-keyed cache of analysis results.
//!
//! Every operation is soft-fail: an unreachable store, a backend error or a
//! corrupt entry reads as a miss, and a failed write is logged and reported
//! as `false`. The cache is never allowed to fail an analysis.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use sonar_models::AnalysisResult;
use tracing::{debug, warn};

use crate::store::CacheStore;

/// Prefix of every cache key.
pub const KEY_PREFIX: &str = "audio:";

/// Hex digits of the URL digest kept in the key.
const KEY_DIGEST_LEN: usize = 16;

/// Length of every key produced by [`cache_key`].
pub const KEY_LEN: usize = KEY_PREFIX.len() + KEY_DIGEST_LEN;

/// Derive the cache key for a URL.
///
/// Format: `audio:{first 16 hex chars of sha256(url)}`
pub fn cache_key(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!("{}{}", KEY_PREFIX, &digest[..KEY_DIGEST_LEN])
}

/// Result of a cache lookup, for metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit,
    Miss,
    /// Store unreachable, erroring, or entry unreadable
    Unavailable,
}

impl LookupOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Analysis cache over any [`CacheStore`].
#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn CacheStore>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Release the underlying store.
    pub async fn close(&self) {
        self.store.close().await;
    }

    /// Round-trip check, for readiness probes.
    pub async fn ping(&self) -> bool {
        self.is_connected() && self.store.ping().await.is_ok()
    }

    /// Return the cached result for `url`, if any.
    pub async fn lookup(&self, url: &str) -> Option<AnalysisResult> {
        self.lookup_with_outcome(url).await.0
    }

    /// Like [`AnalysisCache::lookup`], also reporting why a miss happened.
    pub async fn lookup_with_outcome(&self, url: &str) -> (Option<AnalysisResult>, LookupOutcome) {
        if !self.store.is_connected() {
            return (None, LookupOutcome::Unavailable);
        }

        let key = cache_key(url);
        let bytes = match self.store.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return (None, LookupOutcome::Miss),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed");
                return (None, LookupOutcome::Unavailable);
            }
        };

        match serde_json::from_slice::<AnalysisResult>(&bytes) {
            Ok(result) => {
                debug!(key = %key, "Cache hit");
                (Some(result), LookupOutcome::Hit)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                (None, LookupOutcome::Unavailable)
            }
        }
    }

    /// Store `result` under the key for `url`. Returns whether it was written.
    pub async fn store(&self, url: &str, result: &AnalysisResult, ttl_secs: u64) -> bool {
        if !self.store.is_connected() {
            return false;
        }

        let key = cache_key(url);
        let payload = match serde_json::to_vec(result) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize analysis result");
                return false;
            }
        };

        match self.store.set_ex(&key, &payload, ttl_secs).await {
            Ok(()) => {
                debug!(key = %key, ttl_secs, "Cached analysis result");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache store failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use sonar_models::{AudioClassification, AudioFeatures, AudioFormat, ClassificationResult};
    use std::collections::HashSet;

    fn sample_result() -> AnalysisResult {
        AnalysisResult::from_parts(
            AudioFeatures {
                duration: 5.23,
                sample_rate: 44100,
                channels: 2,
                bit_depth: None,
                file_size: 461_814,
                format: AudioFormat::Mp3,
            },
            ClassificationResult::new(AudioClassification::Speech, 0.8),
        )
    }

    #[test]
    fn test_cache_key_shape() {
        let key = cache_key("https://example.com/test.wav");
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_LEN);
        assert!(key[KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_cache_key_is_deterministic_and_distinct() {
        assert_eq!(
            cache_key("https://example.com/a.mp3"),
            cache_key("https://example.com/a.mp3")
        );

        let keys: HashSet<String> = (0..500)
            .map(|i| cache_key(&format!("https://example.com/track-{}.mp3", i)))
            .collect();
        assert_eq!(keys.len(), 500);
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let store = Arc::new(InMemoryStore::new());
        let cache = AnalysisCache::new(store.clone());
        let url = "https://example.com/test.mp3";

        assert_eq!(cache.lookup(url).await, None);
        assert!(cache.store(url, &sample_result(), 3600).await);
        assert_eq!(cache.lookup(url).await, Some(sample_result()));
        assert_eq!(store.set_calls(), 1);

        let (_, outcome) = cache.lookup_with_outcome(url).await;
        assert_eq!(outcome, LookupOutcome::Hit);
    }

    #[tokio::test]
    async fn test_disconnected_store_is_soft_fail() {
        let store = Arc::new(InMemoryStore::new());
        store.set_connected(false);
        let cache = AnalysisCache::new(store.clone());
        let url = "https://example.com/test.mp3";

        assert!(!cache.store(url, &sample_result(), 3600).await);
        assert_eq!(cache.lookup(url).await, None);
        assert!(!cache.ping().await);
        // Connectivity is checked before the store is touched
        assert_eq!(store.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = Arc::new(InMemoryStore::new());
        let url = "https://example.com/corrupt.wav";
        store
            .set_ex(&cache_key(url), b"{not json", 60)
            .await
            .unwrap();

        let cache = AnalysisCache::new(store);
        let (result, outcome) = cache.lookup_with_outcome(url).await;
        assert_eq!(result, None);
        assert_eq!(outcome, LookupOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = Arc::new(InMemoryStore::new());
        let cache = AnalysisCache::new(store);
        let url = "https://example.com/short.ogg";

        assert!(cache.store(url, &sample_result(), 1).await);
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(cache.lookup(url).await, None);
    }
}
