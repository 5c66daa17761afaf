use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;

use crate::media::MediaDownloader;
use crate::storage::{CatalogItem, Database};

/// Maximum number of episodes downloaded per podcast request.
pub const DOWNLOAD_BATCH_SIZE: i64 = 5;

/// Downloads in flight at once within a request.
pub const DOWNLOAD_CONCURRENCY: usize = 1;

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Acquires media for catalog items and records the resulting paths.
pub struct DownloadWorker {
    db: Database,
    media: Arc<dyn MediaDownloader>,
}

impl DownloadWorker {
    pub fn new(db: Database, media: Arc<dyn MediaDownloader>) -> Self {
        Self { db, media }
    }

    /// Downloads `items` with [`DOWNLOAD_CONCURRENCY`] in flight.
    ///
    /// Failures are logged per item; a failed item keeps no audio path and
    /// is picked up again by the next request.
    pub async fn run(&self, feed_id: i64, items: Vec<CatalogItem>) -> DownloadReport {
        if items.is_empty() {
            return DownloadReport::default();
        }
        tracing::info!(feed_id, count = items.len(), "Downloading episode media");

        let outcomes: Vec<bool> = stream::iter(items)
            .map(|item| async move { self.download_one(feed_id, &item).await })
            .buffered(DOWNLOAD_CONCURRENCY)
            .collect()
            .await;

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        DownloadReport {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    async fn download_one(&self, feed_id: i64, item: &CatalogItem) -> bool {
        let Some(link) = item.link.as_deref() else {
            return false;
        };

        let result = match self.media.download(feed_id, link).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(feed_id, guid = %item.guid, error = %e, "Failed to download media");
                return false;
            }
        };

        let audio = path_string(&result.audio_path);
        let thumbnail = result.thumbnail_path.as_deref().map(path_string);
        match self
            .db
            .update_item_media(feed_id, &item.guid, &audio, thumbnail.as_deref())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(feed_id, guid = %item.guid, error = %e, "Failed to record downloaded media");
                false
            }
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
