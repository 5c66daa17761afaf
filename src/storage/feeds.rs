use chrono::SecondsFormat;

use super::schema::Database;
use super::types::{CatalogFeed, DatabaseError};
use crate::rss::RssChannel;

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert the feed for `url`, or refresh its metadata snapshot if it exists.
    ///
    /// Returns the stored record; its id is stable across calls.
    pub async fn get_or_create_feed(
        &self,
        url: &str,
        channel: &RssChannel,
    ) -> Result<CatalogFeed, DatabaseError> {
        let extensions = if channel.extensions.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&channel.extensions)?)
        };
        let namespaces = if channel.namespaces.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&channel.namespaces)?)
        };
        let last_build_date = channel
            .last_build_date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true));
        let image = channel.image.as_ref();

        let feed: CatalogFeed = sqlx::query_as(
            r#"
            INSERT INTO feeds (
                url, title, description, link, last_build_date, copyright, generator,
                image_url, image_title, image_link, extensions, namespaces
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                link = excluded.link,
                last_build_date = excluded.last_build_date,
                copyright = excluded.copyright,
                generator = excluded.generator,
                image_url = excluded.image_url,
                image_title = excluded.image_title,
                image_link = excluded.image_link,
                extensions = excluded.extensions,
                namespaces = excluded.namespaces,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
        "#,
        )
        .bind(url)
        .bind(&channel.title)
        .bind(&channel.description)
        .bind(&channel.link)
        .bind(last_build_date)
        .bind(&channel.copyright)
        .bind(&channel.generator)
        .bind(image.map(|i| i.url.as_str()))
        .bind(image.map(|i| i.title.as_str()))
        .bind(image.map(|i| i.link.as_str()))
        .bind(extensions)
        .bind(namespaces)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(feed_id = feed.id, url = %url, "Stored feed metadata");
        Ok(feed)
    }
}
