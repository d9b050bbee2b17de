//! Audio format and classification enums.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extensions accepted by the analysis endpoint, with leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = [".mp3", ".wav", ".ogg", ".m4a", ".flac"];

/// Container/codec family of an analyzed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III (also the fallback when nothing else matches)
    #[default]
    Mp3,
    /// RIFF/WAVE PCM
    Wav,
    /// Ogg Vorbis/Opus
    Ogg,
    /// MPEG-4 audio (AAC/ALAC)
    M4a,
    /// Free Lossless Audio Codec
    Flac,
}

impl AudioFormat {
    /// All formats in declaration order.
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Ogg,
        AudioFormat::M4a,
        AudioFormat::Flac,
    ];

    /// Returns the format as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
            Self::Flac => "flac",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => ".mp3",
            Self::Wav => ".wav",
            Self::Ogg => ".ogg",
            Self::M4a => ".m4a",
            Self::Flac => ".flac",
        }
    }

    /// Match a file extension, with or without the leading dot, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.as_str() == ext)
    }

    /// Match a declared `Content-Type` by prefix (parameters such as
    /// `; charset=` are ignored).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        const CONTENT_TYPES: [(&str, AudioFormat); 5] = [
            ("audio/mpeg", AudioFormat::Mp3),
            ("audio/wav", AudioFormat::Wav),
            ("audio/ogg", AudioFormat::Ogg),
            ("audio/mp4", AudioFormat::M4a),
            ("audio/flac", AudioFormat::Flac),
        ];
        CONTENT_TYPES
            .iter()
            .find(|(prefix, _)| content_type.starts_with(prefix))
            .map(|(_, format)| *format)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown enum label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

impl FromStr for AudioFormat {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ParseLabelError {
            kind: "audio format",
            value: s.to_string(),
        })
    }
}

/// Coarse content class assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioClassification {
    Speech,
    Music,
    Silence,
    Noise,
}

impl AudioClassification {
    /// Returns the classification as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Music => "music",
            Self::Silence => "silence",
            Self::Noise => "noise",
        }
    }
}

impl std::fmt::Display for AudioClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioClassification {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "speech" => Ok(Self::Speech),
            "music" => Ok(Self::Music),
            "silence" => Ok(Self::Silence),
            "noise" => Ok(Self::Noise),
            _ => Err(ParseLabelError {
                kind: "classification",
                value: s.to_string(),
            }),
        }
    }
}
