//! Analysis result models.
//!
//! `AnalysisResult` is both the API payload and the cache entry, so its field
//! names and types are the wire contract.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::audio::{AudioClassification, AudioFormat};

/// Technical properties of a decoded audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioFeatures {
    /// Duration in seconds (> 0)
    pub duration: f64,
    /// Native sample rate in Hz (> 0)
    pub sample_rate: u32,
    /// Channel count (>= 1)
    pub channels: u16,
    /// Bits per sample, when the container reports it
    pub bit_depth: Option<u16>,
    /// Size of the downloaded file in bytes
    pub file_size: u64,
    /// Detected container format
    pub format: AudioFormat,
}

/// Classifier output.
///
/// Confidence is clamped to `[0.0, 1.0]` on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct ClassificationResult {
    pub classification: AudioClassification,
    confidence: f64,
}

impl ClassificationResult {
    /// Create a result, clamping the confidence into the unit interval.
    /// A NaN confidence becomes 0.0.
    pub fn new(classification: AudioClassification, confidence: f64) -> Self {
        Self {
            classification,
            confidence: clamp_confidence(confidence),
        }
    }

    /// Result used when classification could not be computed.
    pub fn fallback() -> Self {
        Self::new(AudioClassification::Noise, 0.5)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_confidence)
}

/// Flattened analysis record returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: Option<u16>,
    pub file_size: u64,
    pub format: AudioFormat,
    pub classification: AudioClassification,
    /// In `[0.0, 1.0]`, also when read back from a stored entry
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
}

impl AnalysisResult {
    /// Merge extracted features and classification into one record.
    pub fn from_parts(features: AudioFeatures, classification: ClassificationResult) -> Self {
        Self {
            duration: features.duration,
            sample_rate: features.sample_rate,
            channels: features.channels,
            bit_depth: features.bit_depth,
            file_size: features.file_size,
            format: features.format,
            classification: classification.classification,
            confidence: classification.confidence(),
        }
    }
}
