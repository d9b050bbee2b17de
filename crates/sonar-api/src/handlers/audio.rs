//! Audio analysis handler.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use sonar_models::{describe_validation_errors, AnalyzeAudioRequest, AnalyzeAudioResponse};
use tracing::info;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Analyze the audio file behind a URL.
///
/// POST /v1/audio/analyze
pub async fn analyze_audio(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeAudioRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeAudioResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::unprocessable(e.body_text()))?;

    request
        .validate()
        .map_err(|e| ApiError::unprocessable(describe_validation_errors(&e)))?;

    let url = request.audio_url.trim();
    info!(url = %url, "Analysis requested");
    metrics::record_analysis_request();

    let start = Instant::now();
    let outcome = state.analyzer.analyze(url).await;
    metrics::record_processing_duration(start.elapsed().as_secs_f64());

    let result = outcome.map_err(|e| {
        metrics::record_analysis_error(e.kind().as_str());
        ApiError::from(e)
    })?;

    Ok(Json(AnalyzeAudioResponse::success(result)))
}
