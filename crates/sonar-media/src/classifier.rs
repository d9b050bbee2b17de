//! Rule-based speech/music/silence/noise classification.
//!
//! The first 30 seconds are decoded to mono, resampled to 22.05 kHz, reduced
//! to five descriptors and scored with fixed thresholds. Classification never
//! fails: any error yields [`ClassificationResult::fallback`].

use std::path::Path;

use sonar_models::{AudioClassification, ClassificationResult};
use tracing::{debug, warn};

use crate::decode::{decode_mono, resample};
use crate::dsp;
use crate::error::{MediaError, MediaResult};

/// Sample rate the descriptors are computed at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Seconds of audio considered from the start of the file.
pub const ANALYSIS_WINDOW_SECS: f64 = 30.0;

const SILENCE_RMS: f64 = 0.01;
const NOISE_RMS: f64 = 0.02;

/// Descriptors the rules are evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcousticDescriptors {
    /// Global root-mean-square amplitude
    pub rms: f64,
    /// Mean framewise zero-crossing rate
    pub zcr: f64,
    /// Mean spectral centroid in Hz
    pub spectral_centroid: f64,
    /// Estimated tempo in BPM, 0 when none was found
    pub tempo: f64,
    /// Harmonic energy over total energy
    pub harmonic_ratio: f64,
}

impl AcousticDescriptors {
    /// Compute descriptors for mono samples at `sample_rate`.
    pub fn compute(samples: &[f32], sample_rate: u32) -> MediaResult<Self> {
        let spec = dsp::stft(samples, sample_rate, dsp::N_FFT, dsp::HOP_LENGTH)?;
        let envelope = dsp::onset_strength(&spec);
        let frame_rate = sample_rate as f32 / dsp::HOP_LENGTH as f32;

        Ok(Self {
            rms: dsp::rms(samples) as f64,
            zcr: dsp::zero_crossing_rate(samples, dsp::N_FFT, dsp::HOP_LENGTH) as f64,
            spectral_centroid: dsp::spectral_centroid(&spec) as f64,
            tempo: dsp::estimate_tempo(&envelope, frame_rate).unwrap_or(0.0) as f64,
            harmonic_ratio: dsp::harmonic_ratio(&spec) as f64,
        })
    }
}

/// Apply the classification rules.
pub fn classify_descriptors(d: &AcousticDescriptors) -> ClassificationResult {
    if d.rms < SILENCE_RMS {
        return ClassificationResult::new(AudioClassification::Silence, 0.95);
    }
    if d.rms < NOISE_RMS {
        return ClassificationResult::new(AudioClassification::Noise, 0.75);
    }

    let mut music_score = 0.0;
    if d.tempo > 60.0 {
        music_score += 0.3;
    }
    if d.harmonic_ratio > 0.6 {
        music_score += 0.3;
    }

    let mut speech_score = 0.0;
    if d.zcr > 0.05 && d.zcr < 0.2 {
        speech_score += 0.4;
    }
    if d.spectral_centroid < 2000.0 {
        speech_score += 0.2;
    }

    if music_score > speech_score && music_score > 0.3 {
        ClassificationResult::new(AudioClassification::Music, f64::min(0.95, 0.5 + music_score))
    } else if speech_score > 0.3 {
        ClassificationResult::new(AudioClassification::Speech, f64::min(0.95, 0.5 + speech_score))
    } else {
        ClassificationResult::new(AudioClassification::Noise, 0.6)
    }
}

/// File-level classifier.
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify the file at `path`. CPU-bound, never fails.
    pub fn classify_blocking(&self, path: &Path) -> ClassificationResult {
        match self.describe(path) {
            Ok(descriptors) => {
                let result = classify_descriptors(&descriptors);
                debug!(
                    rms = descriptors.rms,
                    zcr = descriptors.zcr,
                    spectral_centroid = descriptors.spectral_centroid,
                    tempo = descriptors.tempo,
                    harmonic_ratio = descriptors.harmonic_ratio,
                    classification = %result.classification,
                    confidence = result.confidence(),
                    "Classified audio"
                );
                result
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Classification failed, using fallback");
                ClassificationResult::fallback()
            }
        }
    }

    /// Decode the analysis window and compute its descriptors.
    pub fn describe(&self, path: &Path) -> MediaResult<AcousticDescriptors> {
        let pcm = decode_mono(path, Some(ANALYSIS_WINDOW_SECS))?;
        let samples = resample(&pcm.samples, pcm.sample_rate, ANALYSIS_SAMPLE_RATE)?;
        if samples.is_empty() {
            return Err(MediaError::decode("no samples in analysis window"));
        }
        AcousticDescriptors::compute(&samples, ANALYSIS_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn descriptors(rms: f64, zcr: f64, centroid: f64, tempo: f64, hr: f64) -> AcousticDescriptors {
        AcousticDescriptors {
            rms,
            zcr,
            spectral_centroid: centroid,
            tempo,
            harmonic_ratio: hr,
        }
    }

    fn write_wav(dir: &TempDir, name: &str, samples: &[f32]) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: ANALYSIS_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_silence_rule() {
        let result = classify_descriptors(&descriptors(0.005, 0.1, 1000.0, 120.0, 0.3));
        assert_eq!(result.classification, AudioClassification::Silence);
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn test_low_energy_noise_rule() {
        let result = classify_descriptors(&descriptors(0.015, 0.1, 1000.0, 120.0, 0.9));
        assert_eq!(result.classification, AudioClassification::Noise);
        assert_eq!(result.confidence(), 0.75);
    }

    #[test]
    fn test_music_rule() {
        let result = classify_descriptors(&descriptors(0.1, 0.1, 2500.0, 120.0, 0.7));
        assert_eq!(result.classification, AudioClassification::Music);
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn test_speech_wins_ties() {
        // music 0.6 vs speech 0.6
        let result = classify_descriptors(&descriptors(0.1, 0.1, 1500.0, 120.0, 0.7));
        assert_eq!(result.classification, AudioClassification::Speech);
        assert_eq!(result.confidence(), 0.95);
    }

    #[test]
    fn test_speech_rule() {
        let result = classify_descriptors(&descriptors(0.1, 0.1, 2500.0, 0.0, 0.2));
        assert_eq!(result.classification, AudioClassification::Speech);
        assert!((result.confidence() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_weak_scores_are_noise() {
        // music 0.3 is not above the threshold
        let result = classify_descriptors(&descriptors(0.1, 0.4, 4000.0, 120.0, 0.2));
        assert_eq!(result.classification, AudioClassification::Noise);
        assert_eq!(result.confidence(), 0.6);
    }

    #[test]
    fn test_silent_file() {
        let dir = TempDir::new().unwrap();
        let path = write_wav(&dir, "silence.wav", &vec![0.0; ANALYSIS_SAMPLE_RATE as usize * 2]);

        let result = Classifier::new().classify_blocking(&path);
        assert_eq!(result.classification, AudioClassification::Silence);
        assert!(result.confidence() >= 0.9);
    }

    #[test]
    fn test_tone_descriptors() {
        let dir = TempDir::new().unwrap();
        let tone: Vec<f32> = (0..ANALYSIS_SAMPLE_RATE as usize * 2)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 22050.0).sin() * 0.5)
            .collect();
        let path = write_wav(&dir, "tone.wav", &tone);

        let d = Classifier::new().describe(&path).unwrap();
        assert!((d.rms - 0.3535).abs() < 0.01, "rms = {}", d.rms);
        assert!(d.spectral_centroid < 2000.0);
        assert!(d.harmonic_ratio > 0.6);

        let result = Classifier::new().classify_blocking(&path);
        assert_ne!(result.classification, AudioClassification::Silence);
        assert!((0.0..=1.0).contains(&result.confidence()));
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.mp3");
        std::fs::write(&path, b"definitely not an mp3").unwrap();

        let result = Classifier::new().classify_blocking(&path);
        assert_eq!(result, ClassificationResult::fallback());
    }
}
