//! Application state.

use std::sync::Arc;

use sonar_cache::{connect_cache, CacheConfig};
use sonar_media::{Classifier, FeatureExtractor, HttpDownloader};
use tracing::info;

use crate::config::{AnalyzerConfig, ApiConfig};
use crate::services::AudioAnalyzer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub analyzer: Arc<AudioAnalyzer>,
}

impl AppState {
    pub fn new(config: ApiConfig, analyzer: Arc<AudioAnalyzer>) -> Self {
        Self { config, analyzer }
    }

    /// Build the analyzer and its collaborators from the environment.
    ///
    /// An unreachable cache is not an error; the analyzer runs uncached.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let analyzer_config = AnalyzerConfig::from_env();
        let cache_config = CacheConfig::from_env();

        let fetcher = HttpDownloader::new(analyzer_config.download_config())?;
        let cache = connect_cache(&cache_config).await?;
        info!(
            backend = ?cache_config.backend,
            connected = cache.is_connected(),
            "Cache initialized"
        );

        let analyzer = AudioAnalyzer::new(
            Arc::new(fetcher),
            FeatureExtractor::new(analyzer_config.max_duration),
            Classifier::new(),
            cache,
            analyzer_config.cache_ttl,
            analyzer_config.max_concurrent_analyses,
        );

        Ok(Self::new(config, Arc::new(analyzer)))
    }
}
