//! Local media acquisition.
//!
//! Media files live under a single root, laid out as
//! `<root>/<feed_id>/<video_id>/{audio.mp3,thumbnail.jpg}` for episodes and
//! `<root>/<feed_id>/channel/avatar.jpg` for channel artwork. Everything under
//! the root is served at `<base_url>/media/`.

mod channel;
mod downloader;
mod tool;

pub use channel::ChannelThumbnailResolver;
pub use downloader::YtDlp;
pub use tool::YtDlpTool;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from a single media acquisition
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The external tool did not finish in time and was killed
    #[error("Media tool timed out after {0:?}")]
    Timeout(Duration),
    #[error("Media tool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },
    /// No video identifier could be extracted from the URL
    #[error("Unrecognized media URL: {0}")]
    UnrecognizedUrl(String),
    /// The tool reported success but the expected file is missing
    #[error("Expected media file missing: {0}")]
    MissingOutput(PathBuf),
}

/// Files produced for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub audio_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

/// Acquires episode media and channel artwork into the media root.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download audio and thumbnail for the episode at `url`.
    async fn download(&self, feed_id: i64, url: &str) -> Result<DownloadResult, MediaError>;

    /// Resolve the channel artwork, downloading it on first use.
    ///
    /// Failures are logged and reported as `None`.
    async fn channel_thumbnail(&self, feed_id: i64, channel_id: &str) -> Option<PathBuf>;

    /// Public URL for a file under the media root, or `None` if it lies outside it.
    fn media_url(&self, path: &Path, base_url: &str) -> Option<String>;
}

/// Maps `path` under `root` to `<base_url>/media/<relative path>`.
///
/// Relative components are joined with `/` regardless of platform. Paths
/// outside the root, or containing `..`, are rejected.
pub fn servable_url(root: &Path, path: &Path, base_url: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }

    Some(format!(
        "{}/media/{}",
        base_url.trim_end_matches('/'),
        segments.join("/")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servable_url() {
        let root = Path::new("/data/media");
        assert_eq!(
            servable_url(root, Path::new("/data/media/3/abc/audio.mp3"), "http://host:8080/"),
            Some("http://host:8080/media/3/abc/audio.mp3".to_string())
        );
    }

    #[test]
    fn test_servable_url_rejects_outside_root() {
        let root = Path::new("/data/media");
        assert_eq!(servable_url(root, Path::new("/etc/passwd"), "http://h"), None);
        assert_eq!(
            servable_url(root, Path::new("/data/media/../secret"), "http://h"),
            None
        );
        assert_eq!(servable_url(root, root, "http://h"), None);
    }
}
