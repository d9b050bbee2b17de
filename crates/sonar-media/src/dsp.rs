//! Frame-based signal descriptors used by the classifier.
//!
//! All functions take mono f32 samples. Spectral work goes through a centered
//! Hann-windowed STFT computed with `realfft`.

use realfft::RealFftPlanner;

use crate::error::{MediaError, MediaResult};

/// FFT size for spectral descriptors.
pub const N_FFT: usize = 2048;

/// Hop between analysis frames.
pub const HOP_LENGTH: usize = 512;

/// Median filter width for harmonic/percussive separation.
const HPSS_KERNEL: usize = 31;

/// Tempo search range in BPM.
const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 300.0;

/// Center of the log-normal tempo prior.
const PRIOR_BPM: f32 = 120.0;

/// Dynamic range kept by the log-power onset detector.
const TOP_DB: f32 = 80.0;

/// Magnitude spectrogram, one row per frame.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub n_fft: usize,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Center frequency of an FFT bin in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.n_fft as f32
    }
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Centered STFT magnitudes.
///
/// The signal is zero-padded by `n_fft / 2` on both sides so frame `t` is
/// centered on sample `t * hop`.
pub fn stft(signal: &[f32], sample_rate: u32, n_fft: usize, hop: usize) -> MediaResult<Spectrogram> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; signal.len() + 2 * pad];
    padded[pad..pad + signal.len()].copy_from_slice(signal);

    let num_frames = (padded.len() - n_fft) / hop + 1;

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);

    let mut frames = Vec::with_capacity(num_frames);
    let mut scratch = fft.make_scratch_vec();
    let mut frame_buf = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        for (i, sample) in frame_buf.iter_mut().enumerate() {
            *sample = padded[start + i] * window[i];
        }

        fft.process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
            .map_err(|e| MediaError::internal(format!("FFT failed: {:?}", e)))?;

        frames.push(spectrum.iter().map(|c| c.norm()).collect());
    }

    Ok(Spectrogram {
        frames,
        n_fft,
        sample_rate,
    })
}

/// Root-mean-square amplitude over the whole signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Mean of framewise zero-crossing rates.
///
/// Frames are centered with edge padding; non-negative samples count as
/// positive.
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop: usize) -> f32 {
    let (Some(&first), Some(&last)) = (samples.first(), samples.last()) else {
        return 0.0;
    };

    let pad = frame_length / 2;
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.resize(pad, first);
    padded.extend_from_slice(samples);
    padded.resize(padded.len() + pad, last);

    let num_frames = (padded.len() - frame_length) / hop + 1;
    let total: f32 = (0..num_frames)
        .map(|f| {
            let frame = &padded[f * hop..f * hop + frame_length];
            let crossings = frame
                .windows(2)
                .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                .count();
            crossings as f32 / frame_length as f32
        })
        .sum();

    total / num_frames as f32
}

/// Mean of framewise spectral centroids in Hz. Silent frames contribute 0.
pub fn spectral_centroid(spec: &Spectrogram) -> f32 {
    if spec.frames.is_empty() {
        return 0.0;
    }

    let freqs: Vec<f32> = (0..spec.num_bins()).map(|b| spec.bin_frequency(b)).collect();
    let total: f32 = spec
        .frames
        .iter()
        .map(|frame| {
            let energy: f32 = frame.iter().sum();
            if energy <= f32::EPSILON {
                return 0.0;
            }
            let weighted: f32 = frame.iter().zip(&freqs).map(|(m, f)| m * f).sum();
            weighted / energy
        })
        .sum();

    total / spec.frames.len() as f32
}

/// Onset strength envelope: half-wave rectified log-power spectral flux,
/// averaged over bins.
pub fn onset_strength(spec: &Spectrogram) -> Vec<f32> {
    if spec.frames.len() < 2 {
        return Vec::new();
    }

    let mut log_power: Vec<Vec<f32>> = spec
        .frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|m| 10.0 * (m * m).max(1e-10).log10())
                .collect()
        })
        .collect();

    let peak = log_power
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for value in log_power.iter_mut().flatten() {
        *value = value.max(floor);
    }

    let bins = spec.num_bins() as f32;
    log_power
        .windows(2)
        .map(|pair| {
            let flux: f32 = pair[1]
                .iter()
                .zip(&pair[0])
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
            flux / bins
        })
        .collect()
}

/// Estimate tempo in BPM from an onset envelope.
///
/// Picks the autocorrelation lag in the 30-300 BPM range with the highest
/// score after weighting by a log-normal prior centered at 120 BPM.
/// Returns `None` for flat or too-short envelopes.
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32) -> Option<f32> {
    let min_lag = (60.0 * frame_rate / MAX_BPM).floor().max(1.0) as usize;
    let max_lag = (60.0 * frame_rate / MIN_BPM).ceil() as usize;
    if envelope.len() <= min_lag * 2 {
        return None;
    }

    let energy: f32 = envelope.iter().map(|v| v * v).sum();
    if energy <= 1e-8 {
        return None;
    }

    let max_lag = max_lag.min(envelope.len() - 1);
    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let corr: f32 = envelope[lag..]
            .iter()
            .zip(envelope)
            .map(|(a, b)| a * b)
            .sum();
        let bpm = 60.0 * frame_rate / lag as f32;
        let weight = (-0.5 * (bpm / PRIOR_BPM).log2().powi(2)).exp();
        let score = corr * weight;
        if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    best.map(|(lag, _)| 60.0 * frame_rate / lag as f32)
}

fn median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// Share of spectral energy assigned to the harmonic component.
///
/// Harmonic and percussive estimates come from median filtering across time
/// and across frequency; each bin is split with a power-2 soft mask.
pub fn harmonic_ratio(spec: &Spectrogram) -> f32 {
    let num_frames = spec.frames.len();
    let num_bins = spec.num_bins();
    if num_frames == 0 {
        return 0.0;
    }

    let half = HPSS_KERNEL / 2;
    let mut window = Vec::with_capacity(HPSS_KERNEL);
    let mut harmonic_energy = 0.0f64;
    let mut total_energy = 0.0f64;

    for t in 0..num_frames {
        let t_lo = t.saturating_sub(half);
        let t_hi = (t + half + 1).min(num_frames);
        for k in 0..num_bins {
            let magnitude = spec.frames[t][k];
            total_energy += (magnitude as f64).powi(2);
            if magnitude <= 0.0 {
                continue;
            }

            window.clear();
            window.extend((t_lo..t_hi).map(|i| spec.frames[i][k]));
            let h = median(&mut window);

            let k_lo = k.saturating_sub(half);
            let k_hi = (k + half + 1).min(num_bins);
            window.clear();
            window.extend_from_slice(&spec.frames[t][k_lo..k_hi]);
            let p = median(&mut window);

            let (h2, p2) = (h * h, p * p);
            let mask = if h2 + p2 > 0.0 { h2 / (h2 + p2) } else { 0.0 };
            harmonic_energy += (mask as f64 * magnitude as f64).powi(2);
        }
    }

    (harmonic_energy / (total_energy + 1e-8)) as f32
}
