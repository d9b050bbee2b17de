//! Shared data models for the Sonar audio analysis service.
//!
//! This crate provides Serde-serializable types for:
//! - Audio formats and classifications
//! - Extracted features and classifier output
//! - The flattened analysis record (API payload and cache entry)
//! - Request validation and the client-visible error taxonomy

pub mod analysis;
pub mod audio;
pub mod request;

// Re-export common types
pub use analysis::{AnalysisResult, AudioFeatures, ClassificationResult};
pub use audio::{AudioClassification, AudioFormat, ParseLabelError, SUPPORTED_EXTENSIONS};
pub use request::{
    describe_validation_errors, validate_audio_url, AnalyzeAudioRequest, AnalyzeAudioResponse,
    ErrorKind, ResponseStatus,
};
