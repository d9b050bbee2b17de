//! Audio format derivation from URLs, paths and declared content types.
//!
//! These functions are pure: they never touch the file and do not depend on
//! whether decoding succeeds.

use std::path::Path;

use sonar_models::AudioFormat;
use url::Url;

/// Pick the temp-file extension for a download.
///
/// Order: known audio extension in the URL path, then the declared
/// content type, then `.mp3`.
pub fn extension_for(url: &str, content_type: &str) -> &'static str {
    url_format(url)
        .or_else(|| AudioFormat::from_content_type(content_type))
        .unwrap_or_default()
        .extension()
}

/// Detect the format of a downloaded file from its extension, falling back
/// to the declared content type and finally to MP3.
pub fn detect_format(path: &Path, content_type: &str) -> AudioFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(AudioFormat::from_extension)
        .or_else(|| AudioFormat::from_content_type(content_type))
        .unwrap_or_default()
}

/// Format implied by the last path segment of a URL, if any.
fn url_format(url: &str) -> Option<AudioFormat> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        // Not absolute; strip query/fragment by hand
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(AudioFormat::from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        assert_eq!(extension_for("https://example.com/a.wav", ""), ".wav");
        assert_eq!(extension_for("https://example.com/a.FLAC", "audio/mpeg"), ".flac");
        assert_eq!(
            extension_for("https://example.com/a.ogg?token=1#t=5", ""),
            ".ogg"
        );
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(extension_for("https://example.com/stream", "audio/wav"), ".wav");
        assert_eq!(extension_for("https://example.com/stream", "audio/mp4"), ".m4a");
        assert_eq!(
            extension_for("https://example.com/a.bin", "audio/ogg; codecs=opus"),
            ".ogg"
        );
    }

    #[test]
    fn test_extension_default() {
        assert_eq!(extension_for("https://example.com/stream", ""), ".mp3");
        assert_eq!(
            extension_for("https://example.com/file.txt", "text/plain"),
            ".mp3"
        );
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("/tmp/sonar-abc.m4a"), ""),
            AudioFormat::M4a
        );
        assert_eq!(
            detect_format(Path::new("/tmp/sonar-abc"), "audio/flac"),
            AudioFormat::Flac
        );
        assert_eq!(
            detect_format(Path::new("/tmp/sonar-abc.bin"), "application/octet-stream"),
            AudioFormat::Mp3
        );
    }
}
