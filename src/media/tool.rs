use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::MediaError;

/// Handle on the external `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpTool {
    binary: PathBuf,
}

impl YtDlpTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs the tool to completion, killing it if `limit` elapses.
    pub async fn run(&self, args: &[OsString], limit: Duration) -> Result<(), MediaError> {
        tracing::debug!(binary = %self.binary.display(), args = ?args, "Running media tool");

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout(limit))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::ToolFailed {
                status: output.status.to_string(),
                stderr: last_line(&stderr).to_string(),
            });
        }
        Ok(())
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Keeps the best thumbnail variant as `<dir>/<stem>.jpg`.
///
/// `variants` are tried in order as `<stem>.<variant>.jpg`; an empty variant
/// means the canonical file itself. All other `<stem>.*` files are removed.
/// Returns the canonical path if any variant existed.
pub async fn keep_preferred_variant(
    dir: &Path,
    stem: &str,
    variants: &[&str],
) -> Result<Option<PathBuf>, MediaError> {
    let canonical_name = format!("{}.jpg", stem);
    let canonical = dir.join(&canonical_name);

    let mut found = false;
    for variant in variants {
        let candidate = if variant.is_empty() {
            canonical.clone()
        } else {
            dir.join(format!("{}.{}.jpg", stem, variant))
        };
        if tokio::fs::try_exists(&candidate).await? {
            if candidate != canonical {
                tokio::fs::copy(&candidate, &canonical).await?;
            }
            found = true;
            break;
        }
    }

    let prefix = format!("{}.", stem);
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name != canonical_name.as_str() {
            tokio::fs::remove_file(entry.path()).await?;
        }
    }

    Ok(found.then_some(canonical))
}
