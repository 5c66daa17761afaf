use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::tool::{keep_preferred_variant, YtDlpTool};
use super::MediaError;
use crate::util::CHANNEL_URL_BASE;

const CHANNEL_TIMEOUT: Duration = Duration::from_secs(60);
const AVATAR_STEM: &str = "avatar";
const AVATAR_VARIANTS: [&str; 2] = ["avatar_uncropped", ""];

/// Resolves and caches channel artwork at `<root>/<feed_id>/channel/avatar.jpg`.
#[derive(Debug, Clone)]
pub struct ChannelThumbnailResolver {
    tool: YtDlpTool,
    root: PathBuf,
}

impl ChannelThumbnailResolver {
    pub fn new(tool: YtDlpTool, root: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            root: root.into(),
        }
    }

    fn channel_dir(&self, feed_id: i64) -> PathBuf {
        self.root.join(feed_id.to_string()).join("channel")
    }

    /// Returns the cached avatar, downloading it when missing. Failures are logged.
    pub async fn resolve(&self, feed_id: i64, channel_id: &str) -> Option<PathBuf> {
        let dir = self.channel_dir(feed_id);
        let canonical = dir.join(format!("{}.jpg", AVATAR_STEM));

        if tokio::fs::try_exists(&canonical).await.unwrap_or(false) {
            return Some(canonical);
        }

        match self.fetch(channel_id, &dir).await {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                tracing::warn!(feed_id, channel_id = %channel_id, "No channel avatar produced");
                None
            }
            Err(e) => {
                tracing::warn!(
                    feed_id,
                    channel_id = %channel_id,
                    error = %e,
                    "Failed to download channel avatar"
                );
                None
            }
        }
    }

    async fn fetch(&self, channel_id: &str, dir: &Path) -> Result<Option<PathBuf>, MediaError> {
        tokio::fs::create_dir_all(dir).await?;

        let args: Vec<OsString> = vec![
            "--write-all-thumbnails".into(),
            "--skip-download".into(),
            "--convert-thumbnails".into(),
            "jpg".into(),
            "--playlist-items".into(),
            "0".into(),
            "-o".into(),
            dir.join(AVATAR_STEM).into_os_string(),
            format!("{}{}", CHANNEL_URL_BASE, channel_id).into(),
        ];
        self.tool.run(&args, CHANNEL_TIMEOUT).await?;

        keep_preferred_variant(dir, AVATAR_STEM, &AVATAR_VARIANTS).await
    }
}
