//! Download a served WAV file and run it through extraction and classification.

use std::io::Cursor;
use std::time::Duration;

use sonar_media::{
    AudioFetcher, Classifier, DownloadConfig, FeatureExtractor, HttpDownloader, MediaError,
};
use sonar_models::{AudioClassification, AudioFormat, ErrorKind};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn silent_wav(rate: u32, seconds: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..rate * seconds {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn downloader(dir: &TempDir) -> HttpDownloader {
    HttpDownloader::new(DownloadConfig {
        timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        max_file_size: 10 * 1024 * 1024,
        temp_dir: dir.path().to_path_buf(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_served_wav_is_analyzed_and_removed() {
    let server = MockServer::start().await;
    let body = silent_wav(8000, 3);
    Mock::given(method("GET"))
        .and(path("/quiet.wav"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(body.clone()),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let download = downloader(&dir)
        .download(&format!("{}/quiet.wav", server.uri()))
        .await
        .unwrap();
    let local = download.path().to_path_buf();
    assert_eq!(download.file_size, body.len() as u64);

    let features = FeatureExtractor::new(600.0)
        .extract_blocking(download.path(), &download.content_type, download.file_size)
        .unwrap();
    assert_eq!(features.duration, 3.0);
    assert_eq!(features.sample_rate, 8000);
    assert_eq!(features.format, AudioFormat::Wav);

    let classification = Classifier::new().classify_blocking(download.path());
    assert_eq!(classification.classification, AudioClassification::Silence);

    drop(download);
    assert!(!local.exists());
}

#[tokio::test]
async fn test_too_long_audio_is_validation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(silent_wav(8000, 5)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let download = downloader(&dir)
        .download(&format!("{}/long.wav", server.uri()))
        .await
        .unwrap();

    let err = FeatureExtractor::new(2.0)
        .extract_blocking(download.path(), &download.content_type, download.file_size)
        .unwrap_err();
    assert!(matches!(err, MediaError::Validation(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}
