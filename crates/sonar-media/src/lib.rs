#![deny(unreachable_patterns)]
//! Audio acquisition and analysis.
//!
//! This crate provides:
//! - Streaming HTTP download into scoped temp files
//! - Container probing and PCM decoding via symphonia
//! - Feature extraction with a duration limit
//! - Rule-based speech/music/silence/noise classification

pub mod classifier;
pub mod decode;
pub mod download;
pub mod dsp;
pub mod error;
pub mod features;
pub mod format;
pub mod fs_utils;

pub use classifier::{
    classify_descriptors, AcousticDescriptors, Classifier, ANALYSIS_SAMPLE_RATE,
    ANALYSIS_WINDOW_SECS,
};
pub use decode::{decode_mono, probe_container, ContainerInfo, PcmAudio};
pub use download::{AudioFetcher, DownloadConfig, DownloadMetadata, HttpDownloader};
pub use error::{MediaError, MediaResult};
pub use features::FeatureExtractor;
pub use format::{detect_format, extension_for};
pub use fs_utils::{cleanup_temp_file, TempAudio};
