use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::channel::ChannelThumbnailResolver;
use super::tool::{keep_preferred_variant, YtDlpTool};
use super::{servable_url, DownloadResult, MediaDownloader, MediaError};
use crate::util::video_id;

const AUDIO_TIMEOUT: Duration = Duration::from_secs(300);
const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(60);

const AUDIO_FILE: &str = "audio.mp3";
const THUMBNAIL_STEM: &str = "thumbnail";
const THUMBNAIL_VARIANTS: [&str; 4] = ["maxresdefault", "hqdefault", "sddefault", ""];

/// [`MediaDownloader`] backed by `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    tool: YtDlpTool,
    root: PathBuf,
    channels: ChannelThumbnailResolver,
}

impl YtDlp {
    pub fn new(tool: YtDlpTool, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            channels: ChannelThumbnailResolver::new(tool.clone(), root.clone()),
            tool,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch_into(&self, url: &str, out_dir: &Path) -> Result<DownloadResult, MediaError> {
        let audio_template = out_dir.join("audio.%(ext)s");
        let audio_args: Vec<OsString> = vec![
            "-x".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            "0".into(),
            "-o".into(),
            audio_template.into_os_string(),
            url.into(),
        ];
        self.tool.run(&audio_args, AUDIO_TIMEOUT).await?;

        let thumbnail_args: Vec<OsString> = vec![
            "--write-all-thumbnails".into(),
            "--skip-download".into(),
            "--convert-thumbnails".into(),
            "jpg".into(),
            "-o".into(),
            out_dir.join(THUMBNAIL_STEM).into_os_string(),
            url.into(),
        ];
        self.tool.run(&thumbnail_args, THUMBNAIL_TIMEOUT).await?;

        let audio_path = out_dir.join(AUDIO_FILE);
        if !tokio::fs::try_exists(&audio_path).await? {
            return Err(MediaError::MissingOutput(audio_path));
        }

        let thumbnail_path =
            keep_preferred_variant(out_dir, THUMBNAIL_STEM, &THUMBNAIL_VARIANTS).await?;

        Ok(DownloadResult {
            audio_path,
            thumbnail_path,
        })
    }
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn download(&self, feed_id: i64, url: &str) -> Result<DownloadResult, MediaError> {
        let Some(video_id) = video_id(url) else {
            tracing::warn!(url = %url, "Could not extract video id from URL");
            return Err(MediaError::UnrecognizedUrl(url.to_string()));
        };

        let out_dir = self.root.join(feed_id.to_string()).join(&video_id);
        let audio_path = out_dir.join(AUDIO_FILE);
        let thumbnail_path = out_dir.join(format!("{}.jpg", THUMBNAIL_STEM));

        if tokio::fs::try_exists(&audio_path).await? && tokio::fs::try_exists(&thumbnail_path).await? {
            tracing::debug!(video_id = %video_id, "Media already present, skipping download");
            return Ok(DownloadResult {
                audio_path,
                thumbnail_path: Some(thumbnail_path),
            });
        }

        tokio::fs::create_dir_all(&out_dir).await?;
        tracing::info!(feed_id, video_id = %video_id, "Downloading episode media");

        match self.fetch_into(url, &out_dir).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&out_dir).await {
                    tracing::warn!(
                        dir = %out_dir.display(),
                        error = %cleanup,
                        "Failed to remove partial download"
                    );
                }
                Err(e)
            }
        }
    }

    async fn channel_thumbnail(&self, feed_id: i64, channel_id: &str) -> Option<PathBuf> {
        self.channels.resolve(feed_id, channel_id).await
    }

    fn media_url(&self, path: &Path, base_url: &str) -> Option<String> {
        servable_url(&self.root, path, base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_rejects_unrecognized_url() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = YtDlp::new(YtDlpTool::new("/nonexistent/yt-dlp"), dir.path());

        let result = downloader.download(1, "https://example.com/video").await;
        assert!(matches!(result, Err(MediaError::UnrecognizedUrl(_))));
    }

    #[tokio::test]
    async fn test_download_reuses_existing_media() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("1").join("abc");
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("audio.mp3"), b"mp3").unwrap();
        std::fs::write(out_dir.join("thumbnail.jpg"), b"jpg").unwrap();

        // The binary does not exist, so any tool invocation would fail
        let downloader = YtDlp::new(YtDlpTool::new("/nonexistent/yt-dlp"), dir.path());
        let result = downloader
            .download(1, "https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();

        assert_eq!(result.audio_path, out_dir.join("audio.mp3"));
        assert_eq!(result.thumbnail_path, Some(out_dir.join("thumbnail.jpg")));
    }

    #[tokio::test]
    async fn test_failed_download_removes_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = YtDlp::new(YtDlpTool::new("/nonexistent/yt-dlp"), dir.path());

        let result = downloader.download(1, "https://youtu.be/xyz").await;
        assert!(result.is_err());
        assert!(!dir.path().join("1").join("xyz").exists());
    }

    #[test]
    fn test_media_url_under_root() {
        let downloader = YtDlp::new(YtDlpTool::new("yt-dlp"), "/srv/media");
        assert_eq!(
            downloader.media_url(Path::new("/srv/media/2/abc/audio.mp3"), "https://pods.example"),
            Some("https://pods.example/media/2/abc/audio.mp3".to_string())
        );
    }
}
