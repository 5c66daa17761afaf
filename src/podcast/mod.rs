//! Podcast assembly: persists converted items, enriches them with local
//! media, and rebuilds the channel from the catalog.

mod records;
mod worker;

pub use worker::{DownloadReport, DownloadWorker, DOWNLOAD_BATCH_SIZE, DOWNLOAD_CONCURRENCY};

use std::path::Path;
use std::sync::Arc;

use crate::media::MediaDownloader;
use crate::rss::{Enclosure, RssChannel, RssImage};
use crate::storage::{Database, DatabaseError, ItemDraft};
use crate::util::channel_id;
use records::{channel_from_record, item_from_record};

/// Merges freshly converted channels with the catalog.
pub struct PodcastService {
    db: Database,
    media: Arc<dyn MediaDownloader>,
    base_url: String,
    batch_size: i64,
}

impl PodcastService {
    pub fn new(db: Database, media: Arc<dyn MediaDownloader>, base_url: impl Into<String>) -> Self {
        Self {
            db,
            media,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            batch_size: DOWNLOAD_BATCH_SIZE,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Stores `channel` for `source_url` and returns the merged podcast channel.
    ///
    /// The result holds every item ever seen for the feed, not only those in
    /// the current source, with media fields pointing at servable URLs. Media
    /// failures are logged and never fail the merge.
    pub async fn merge(
        &self,
        source_url: &str,
        channel: &RssChannel,
    ) -> Result<RssChannel, DatabaseError> {
        let feed = self.db.get_or_create_feed(source_url, channel).await?;

        let drafts = channel
            .items
            .iter()
            .map(|item| ItemDraft::from_item(feed.id, item))
            .collect::<Result<Vec<_>, _>>()?;
        let new_count = self.db.upsert_items(feed.id, &drafts).await?;

        let pending = self
            .db
            .get_items_needing_download(feed.id, self.batch_size)
            .await?;
        let report = DownloadWorker::new(self.db.clone(), Arc::clone(&self.media))
            .run(feed.id, pending)
            .await;
        if report.failed > 0 {
            tracing::warn!(
                feed_id = feed.id,
                failed = report.failed,
                attempted = report.attempted,
                "Some episode downloads failed"
            );
        }

        let stored = self.db.get_items(feed.id, None).await?;
        let mut merged = channel_from_record(&feed)?;
        merged.items = stored
            .iter()
            .map(item_from_record)
            .collect::<Result<Vec<_>, _>>()?;

        for item in &mut merged.items {
            if let Some(enclosure) = item.enclosure.take() {
                let path = Path::new(&enclosure.url).to_path_buf();
                match self.media.media_url(&path, &self.base_url) {
                    Some(url) => {
                        let length = tokio::fs::metadata(&path)
                            .await
                            .map(|m| m.len())
                            .unwrap_or(0);
                        item.enclosure = Some(Enclosure {
                            url,
                            length,
                            ..enclosure
                        });
                    }
                    None => {
                        tracing::warn!(path = %path.display(), "Audio file outside media root");
                    }
                }
            }

            if let Some(thumbnail) = item.itunes_image.take() {
                let path = Path::new(&thumbnail);
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    item.itunes_image = self.media.media_url(path, &self.base_url);
                }
            }
        }

        if let Some(channel_id) = channel_id(source_url) {
            if let Some(avatar) = self.media.channel_thumbnail(feed.id, &channel_id).await {
                if let Some(url) = self.media.media_url(&avatar, &self.base_url) {
                    merged.image = Some(RssImage {
                        url: url.clone(),
                        title: merged.title.clone(),
                        link: merged.link.clone(),
                    });
                    merged.itunes_image = Some(url);
                }
            }
        }

        tracing::info!(
            url = %source_url,
            feed_id = feed.id,
            entries = merged.items.len(),
            from_source = new_count,
            downloaded = report.succeeded,
            "Assembled podcast feed"
        );
        Ok(merged)
    }
}
