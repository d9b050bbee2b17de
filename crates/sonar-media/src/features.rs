//! Technical feature extraction for downloaded audio.

use std::path::Path;

use sonar_models::AudioFeatures;
use tracing::debug;

use crate::decode::{decode_mono, probe_container};
use crate::error::{MediaError, MediaResult};
use crate::format::detect_format;

/// Extracts [`AudioFeatures`] and enforces the duration limit.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    max_duration: f64,
}

impl FeatureExtractor {
    /// `max_duration` is in seconds.
    pub fn new(max_duration: f64) -> Self {
        Self { max_duration }
    }

    /// Extract features from a downloaded file. CPU-bound; callers on the
    /// async runtime should run it on the blocking pool.
    ///
    /// Container metadata is tried first. If that fails for any reason the
    /// file is fully decoded to mono instead, which reports one channel and no
    /// bit depth.
    pub fn extract_blocking(
        &self,
        path: &Path,
        content_type: &str,
        file_size: u64,
    ) -> MediaResult<AudioFeatures> {
        let format = detect_format(path, content_type);

        let (duration, sample_rate, channels, bit_depth) = match probe_container(path) {
            Ok(info) => (info.duration, info.sample_rate, info.channels, info.bit_depth),
            Err(primary) => {
                debug!(
                    path = %path.display(),
                    error = %primary,
                    "Container probe failed, decoding samples instead"
                );
                self.fallback_features(path)?
            }
        };

        if duration > self.max_duration {
            return Err(MediaError::validation(format!(
                "Audio too long: {:.1}s",
                duration
            )));
        }

        Ok(AudioFeatures {
            duration,
            sample_rate,
            channels,
            bit_depth,
            file_size,
            format,
        })
    }

    /// Duration, sample rate, channels and bit depth from a full mono decode.
    fn fallback_features(&self, path: &Path) -> MediaResult<(f64, u32, u16, Option<u16>)> {
        let pcm = decode_mono(path, Some(self.max_duration))
            .map_err(|e| MediaError::validation(format!("Cannot process audio file: {}", e)))?;
        if pcm.truncated {
            return Err(MediaError::validation(format!(
                "Audio too long: more than {:.1}s",
                self.max_duration
            )));
        }
        Ok((pcm.duration(), pcm.sample_rate, 1, None))
    }
}
