//! Request/response schemas for the analysis endpoint.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::analysis::AnalysisResult;
use crate::audio::SUPPORTED_EXTENSIONS;

/// Request body for `POST /v1/audio/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct AnalyzeAudioRequest {
    /// Absolute http(s) URL of the audio file
    #[validate(
        length(min = 1, max = 2048),
        url,
        custom(function = "validate_audio_url")
    )]
    pub audio_url: String,
}

impl AnalyzeAudioRequest {
    pub fn new(audio_url: impl Into<String>) -> Self {
        Self {
            audio_url: audio_url.into(),
        }
    }
}

/// Check scheme, host and file extension of an audio URL.
///
/// The extension is taken from the URL path so query strings and fragments
/// do not hide it.
pub fn validate_audio_url(value: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(value.trim()).map_err(|_| invalid("invalid_url", "Invalid URL"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(
            "invalid_scheme",
            "Only HTTP and HTTPS URLs are allowed",
        ));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing_host", "URL must have a valid host"));
    }

    let path = parsed.path().to_ascii_lowercase();
    if !SUPPORTED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Err(invalid("invalid_format", "Invalid audio file format"));
    }

    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Flatten validation errors into a single human-readable line.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Outcome label of an analysis response. Failures use the error body
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

/// Response body for `POST /v1/audio/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeAudioResponse {
    pub status: ResponseStatus,
    pub data: AnalysisResult,
}

impl AnalyzeAudioResponse {
    pub fn success(data: AnalysisResult) -> Self {
        Self {
            status: ResponseStatus::Success,
            data,
        }
    }
}

/// Client-visible failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or unsupported input (size, duration, undecodable)
    Validation,
    /// Remote resource missing or returned a non-2xx status
    NotFound,
    /// Anything unanticipated
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
