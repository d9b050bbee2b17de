//! Audio decoding with symphonia.
//!
//! Two entry points:
//! - [`probe_container`] reads container metadata and proves the stream is
//!   decodable without decoding all of it.
//! - [`decode_mono`] fully decodes to mono f32 PCM at the native rate, used by
//!   the feature fallback path and by the classifier.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Container-level facts about an audio file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerInfo {
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: Option<u16>,
}

/// Mono PCM samples at their native rate.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Decoding stopped at the requested limit with audio remaining
    pub truncated: bool,
}

impl PcmAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

struct OpenedTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
}

fn open_track(path: &Path) -> MediaResult<OpenedTrack> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MediaError::decode(format!("probe: {}", e)))?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| MediaError::decode("no audio track found"))?;
    let track_id = track.id;

    let decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::decode(format!("codec: {}", e)))?;

    Ok(OpenedTrack {
        format,
        decoder,
        track_id,
    })
}

/// Whether a reader error marks the normal end of the stream.
fn is_end_of_stream(err: &SymphoniaError) -> bool {
    match err {
        SymphoniaError::IoError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        SymphoniaError::ResetRequired => true,
        _ => false,
    }
}

/// Read container metadata and verify at least one packet decodes.
///
/// Fails when the sample rate or channel layout is not declared by the
/// container; callers fall back to [`decode_mono`] in that case.
pub fn probe_container(path: &Path) -> MediaResult<ContainerInfo> {
    let OpenedTrack {
        mut format,
        mut decoder,
        track_id,
    } = open_track(path)?;

    let params = decoder.codec_params().clone();
    let sample_rate = params
        .sample_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| MediaError::decode("unknown sample rate"))?;
    let channels = params
        .channels
        .map(|c| c.count() as u16)
        .filter(|count| *count > 0)
        .ok_or_else(|| MediaError::decode("unknown channel layout"))?;
    let bit_depth = params
        .bits_per_sample
        .or(params.bits_per_coded_sample)
        .map(|bits| bits as u16);

    let mut decoded_any = false;
    let mut counted_frames: u64 = 0;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(MediaError::decode(format!("packet: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        counted_frames += packet.dur;

        if !decoded_any {
            match decoder.decode(&packet) {
                Ok(_) => decoded_any = true,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(error = %e, "Skipping undecodable packet while probing");
                }
                Err(e) => return Err(MediaError::decode(format!("decode: {}", e))),
            }
        }

        // The declared frame count makes the rest of the scan unnecessary
        if decoded_any && params.n_frames.is_some() {
            break;
        }
    }

    if !decoded_any {
        return Err(MediaError::decode("no decodable audio packets"));
    }

    let frames = params.n_frames.unwrap_or(counted_frames);
    let duration = match params.time_base {
        Some(tb) => {
            let time = tb.calc_time(frames);
            time.seconds as f64 + time.frac
        }
        None => frames as f64 / sample_rate as f64,
    };

    if duration <= 0.0 {
        return Err(MediaError::decode("empty audio stream"));
    }

    Ok(ContainerInfo {
        duration,
        sample_rate,
        channels,
        bit_depth,
    })
}

/// Decode the whole stream (or its first `limit_secs`) to mono f32 PCM.
pub fn decode_mono(path: &Path, limit_secs: Option<f64>) -> MediaResult<PcmAudio> {
    let OpenedTrack {
        mut format,
        mut decoder,
        track_id,
    } = open_track(path)?;

    let mut sample_rate = decoder.codec_params().sample_rate.unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();
    let mut truncated = false;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(MediaError::decode(format!("packet: {}", e))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => return Err(MediaError::decode(format!("decode: {}", e))),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }
        sample_rate = spec.rate;
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(frames as u64, spec);
        buf.copy_interleaved_ref(decoded);

        if channels > 1 {
            samples.extend(
                buf.samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        } else {
            samples.extend_from_slice(buf.samples());
        }

        if let Some(limit) = limit_secs {
            let max_samples = (limit * sample_rate as f64).ceil() as usize;
            if samples.len() > max_samples {
                samples.truncate(max_samples);
                truncated = true;
                break;
            }
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(MediaError::decode("no audio samples decoded"));
    }

    debug!(
        samples = samples.len(),
        sample_rate,
        truncated,
        "Decoded audio to mono PCM"
    );

    Ok(PcmAudio {
        samples,
        sample_rate,
        truncated,
    })
}

/// Resample mono PCM with a windowed-sinc interpolator.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> MediaResult<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| MediaError::internal(format!("resampler init: {}", e)))?;

    let expected_len = (samples.len() as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(expected_len + chunk_size);
    let mut input = vec![0.0f32; chunk_size];

    for chunk in samples.chunks(chunk_size) {
        input[..chunk.len()].copy_from_slice(chunk);
        input[chunk.len()..].fill(0.0);

        let result = resampler
            .process(&[&input[..]], None)
            .map_err(|e| MediaError::internal(format!("resample: {}", e)))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    output.truncate(expected_len);
    Ok(output)
}
