//! Audio download over HTTP(S).
//!
//! The body is streamed into a uniquely named temp file under the configured
//! directory. The returned [`DownloadMetadata`] owns that file through a
//! [`TempAudio`] guard, so the caller never has to remember to delete it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::format::extension_for;
use crate::fs_utils::TempAudio;

/// Prefix of every temp file created by the downloader.
pub const TEMP_FILE_PREFIX: &str = "sonar-";

const EMPTY_BODY: &str = "Downloaded file is empty";

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 10;

/// Idle keep-alive connections kept per host.
const MAX_IDLE_PER_HOST: usize = 5;

/// Downloader settings.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Overall request timeout
    pub timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Largest accepted body in bytes
    pub max_file_size: u64,
    /// Directory for temp files (created if missing)
    pub temp_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_file_size: 50 * 1024 * 1024,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// A completed download.
#[derive(Debug)]
pub struct DownloadMetadata {
    pub url: String,
    /// Declared `Content-Type`, empty when absent
    pub content_type: String,
    /// Bytes written to disk
    pub file_size: u64,
    temp: TempAudio,
}

impl DownloadMetadata {
    /// Wrap an already-written file. Ownership of the file moves into the
    /// returned value.
    pub fn new(
        url: impl Into<String>,
        content_type: impl Into<String>,
        file_size: u64,
        temp: TempAudio,
    ) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
            file_size,
            temp,
        }
    }

    /// Local path of the downloaded file.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// Source of audio files.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Fetch `url` into a local temp file.
    async fn download(&self, url: &str) -> MediaResult<DownloadMetadata>;
}

/// reqwest-backed [`AudioFetcher`].
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

impl HttpDownloader {
    pub fn new(config: DownloadConfig) -> MediaResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .user_agent(concat!("sonar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create an empty, uniquely named temp file and hand it to a guard.
    async fn create_temp_file(&self, extension: &str) -> MediaResult<(tokio::fs::File, TempAudio)> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        let (file, path) = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(extension)
            .tempfile_in(&self.config.temp_dir)?
            .keep()
            .map_err(|e| MediaError::from(e.error))?;

        Ok((tokio::fs::File::from_std(file), TempAudio::new(path)))
    }
}

#[async_trait]
impl AudioFetcher for HttpDownloader {
    async fn download(&self, url: &str) -> MediaResult<DownloadMetadata> {
        let max_size = self.config.max_file_size;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::NotFound {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        match response.content_length() {
            Some(0) => return Err(MediaError::validation(EMPTY_BODY)),
            Some(length) if length > max_size => {
                return Err(MediaError::validation(format!(
                    "File too large: {} bytes",
                    length
                )));
            }
            _ => {}
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        // Nothing touches the disk until the body has produced a byte
        let first_chunk = loop {
            match response
                .chunk()
                .await
                .map_err(|e| MediaError::transport(url, e.to_string()))?
            {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => break chunk,
                None => return Err(MediaError::validation(EMPTY_BODY)),
            }
        };

        let extension = extension_for(url, &content_type);
        let (mut file, temp) = self.create_temp_file(extension).await?;
        debug!(url = %url, path = %temp.path().display(), "Streaming audio to temp file");

        // Any early return below drops `temp` and removes the partial file
        let mut next_chunk = Some(first_chunk);
        let mut written: u64 = 0;
        while let Some(chunk) = next_chunk {
            written += chunk.len() as u64;
            if written > max_size {
                return Err(MediaError::validation(format!(
                    "File too large: {} bytes",
                    written
                )));
            }
            file.write_all(&chunk).await?;
            next_chunk = response
                .chunk()
                .await
                .map_err(|e| MediaError::transport(url, e.to_string()))?;
        }
        file.flush().await?;
        drop(file);

        let file_size = tokio::fs::metadata(temp.path()).await?.len();

        info!(
            url = %url,
            file_size,
            content_type = %content_type,
            "Downloaded audio file"
        );

        Ok(DownloadMetadata::new(url, content_type, file_size, temp))
    }
}
