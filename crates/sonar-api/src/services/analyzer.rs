//! Audio analysis orchestration.
//!
//! Pipeline per URL: cache lookup, download, feature extraction,
//! classification, best-effort cache store. The downloaded file is owned by
//! the download result for the whole run and removed exactly once when it
//! goes out of scope, including on error and when the future is dropped.

use std::sync::Arc;

use sonar_cache::AnalysisCache;
use sonar_media::{AudioFetcher, Classifier, FeatureExtractor, MediaError};
use sonar_models::{AnalysisResult, ErrorKind};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::metrics;

/// Failure of a single analysis, already reduced to its client-visible kind.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<MediaError> for AnalysisError {
    fn from(err: MediaError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}

/// Analyzes audio URLs with a URL-keyed result cache.
pub struct AudioAnalyzer {
    fetcher: Arc<dyn AudioFetcher>,
    extractor: FeatureExtractor,
    classifier: Classifier,
    cache: AnalysisCache,
    cache_ttl: u64,
    permits: Arc<Semaphore>,
}

impl AudioAnalyzer {
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        extractor: FeatureExtractor,
        classifier: Classifier,
        cache: AnalysisCache,
        cache_ttl: u64,
        max_concurrent_analyses: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            classifier,
            cache,
            cache_ttl,
            permits: Arc::new(Semaphore::new(max_concurrent_analyses.max(1))),
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyze the audio at `url`.
    #[instrument(name = "analyze", skip(self, url), fields(url = %url))]
    pub async fn analyze(&self, url: &str) -> Result<AnalysisResult, AnalysisError> {
        let (cached, outcome) = self.cache.lookup_with_outcome(url).await;
        metrics::record_cache_lookup(outcome.as_str());
        if let Some(result) = cached {
            info!("Returning cached analysis");
            return Ok(result);
        }

        let download = self.fetcher.download(url).await.map_err(|e| {
            warn!(error = %e, "Download failed");
            AnalysisError::from(e)
        })?;

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AnalysisError::Internal("analysis pool closed".to_string()))?;

        // Held by the blocking task until decoding stops, even if this
        // future is dropped
        let extractor = self.extractor.clone();
        let classifier = self.classifier.clone();
        let path = download.path().to_path_buf();
        let content_type = download.content_type.clone();
        let file_size = download.file_size;
        let (features, classification) = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let features = extractor.extract_blocking(&path, &content_type, file_size)?;
            Ok::<_, MediaError>((features, classifier.classify_blocking(&path)))
        })
        .await
        .map_err(|e| AnalysisError::Internal(format!("Analysis task failed: {}", e)))?
        .map_err(|e| {
            warn!(path = %download.path().display(), error = %e, "Feature extraction failed");
            AnalysisError::from(e)
        })?;

        let result = AnalysisResult::from_parts(features, classification);
        if !self.cache.store(url, &result, self.cache_ttl).await {
            warn!("Analysis result not cached");
        }

        info!(
            duration = result.duration,
            classification = %result.classification,
            confidence = result.confidence,
            "Analysis complete"
        );

        Ok(result)
    }
}
