//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sonar_api::{create_router, ApiConfig, AppState, AudioAnalyzer};
use sonar_cache::{AnalysisCache, InMemoryStore};
use sonar_media::{
    AudioFetcher, Classifier, DownloadMetadata, FeatureExtractor, MediaError, MediaResult,
    TempAudio,
};
use tempfile::TempDir;
use tower::ServiceExt;

const RATE: u32 = 22050;

/// Writes a silent mono WAV of the given length for every download.
struct SilentWavFetcher {
    dir: PathBuf,
    seconds: u32,
    calls: AtomicUsize,
}

impl SilentWavFetcher {
    fn new(dir: &Path, seconds: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            seconds,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AudioFetcher for SilentWavFetcher {
    async fn download(&self, url: &str) -> MediaResult<DownloadMetadata> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("sonar-{}.wav", n));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..RATE * self.seconds {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let size = std::fs::metadata(&path)?.len();
        Ok(DownloadMetadata::new(url, "audio/wav", size, TempAudio::new(path)))
    }
}

enum Failure {
    NotFound,
    Transport,
}

struct FailingFetcher(Failure);

#[async_trait]
impl AudioFetcher for FailingFetcher {
    async fn download(&self, url: &str) -> MediaResult<DownloadMetadata> {
        match self.0 {
            Failure::NotFound => Err(MediaError::NotFound {
                status: 404,
                url: url.to_string(),
            }),
            Failure::Transport => Err(MediaError::transport(url, "connection refused")),
        }
    }
}

fn app_with(fetcher: Arc<dyn AudioFetcher>, store: Arc<InMemoryStore>, max_duration: f64) -> Router {
    let analyzer = AudioAnalyzer::new(
        fetcher,
        FeatureExtractor::new(max_duration),
        Classifier::new(),
        AnalysisCache::new(store),
        3600,
        2,
    );
    let state = AppState::new(ApiConfig::default(), Arc::new(analyzer));
    create_router(state, None)
}

fn analyze_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/audio/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::NotFound)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Audio Analyzer API is healthy", "status": "ok"})
    );
}

#[tokio::test]
async fn test_ready_reports_cache_state() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(Arc::new(FailingFetcher(Failure::NotFound)), store.clone(), 600.0);

    let (status, body) = send(app.clone(), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["cache"]["status"], "ok");

    store.set_connected(false);
    let (status, body) = send(app, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["cache"]["status"], "error");
}

#[tokio::test]
async fn test_analyze_success() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(SilentWavFetcher::new(dir.path(), 2));
    let app = app_with(fetcher, store.clone(), 600.0);

    let (status, body) = send(
        app,
        analyze_request(r#"{"audio_url": "https://cdn.example.com/quiet.wav"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["duration"], 2.0);
    assert_eq!(body["data"]["sample_rate"], RATE);
    assert_eq!(body["data"]["channels"], 1);
    assert_eq!(body["data"]["format"], "wav");
    assert_eq!(body["data"]["classification"], "silence");
    assert_eq!(store.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_url_is_unprocessable() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::NotFound)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    for body in [
        r#"{"audio_url": "ftp://host/a.mp3"}"#,
        r#"{"audio_url": "https://host/a.txt"}"#,
        r#"{"audio_url": "not a url"}"#,
    ] {
        let (status, json) = send(app.clone(), analyze_request(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
        assert!(json["detail"].as_str().unwrap().contains("audio_url"));
    }
}

#[tokio::test]
async fn test_malformed_body_is_unprocessable() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::NotFound)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    let (status, json) = send(app, analyze_request(r#"{"url": "https://host/a.mp3"}"#)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].is_string());
}

#[tokio::test]
async fn test_too_long_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let fetcher = Arc::new(SilentWavFetcher::new(dir.path(), 3));
    let app = app_with(fetcher, store.clone(), 2.0);

    let (status, body) = send(
        app,
        analyze_request(r#"{"audio_url": "https://cdn.example.com/long.wav"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Audio too long: 3.0s");
    assert!(store.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::NotFound)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    let (status, body) = send(
        app,
        analyze_request(r#"{"audio_url": "https://cdn.example.com/gone.mp3"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Audio file not found");
}

#[tokio::test]
async fn test_transport_failure_hides_detail() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::Transport)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    let (status, body) = send(
        app,
        analyze_request(r#"{"audio_url": "https://cdn.example.com/a.mp3"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal server error");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = app_with(
        Arc::new(FailingFetcher(Failure::NotFound)),
        Arc::new(InMemoryStore::new()),
        600.0,
    );

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}
