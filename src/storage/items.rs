use super::schema::Database;
use super::types::{CatalogItem, DatabaseError, ItemDraft};

impl Database {
    // ========================================================================
    // Item Operations
    // ========================================================================

    /// Upsert items keyed by `(feed_id, guid)` in a single transaction.
    ///
    /// Existing rows are updated in place. Media paths use COALESCE so a draft
    /// without paths never clears ones recorded by an earlier download.
    pub async fn upsert_items(
        &self,
        feed_id: i64,
        drafts: &[ItemDraft],
    ) -> Result<usize, DatabaseError> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for draft in drafts {
            sqlx::query(
                r#"
                INSERT INTO items (
                    feed_id, guid, title, link, description, pub_date, author,
                    content, categories, extensions, audio_path, thumbnail_path
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(feed_id, guid) DO UPDATE SET
                    title = excluded.title,
                    link = excluded.link,
                    description = excluded.description,
                    pub_date = excluded.pub_date,
                    author = excluded.author,
                    content = excluded.content,
                    categories = excluded.categories,
                    extensions = excluded.extensions,
                    audio_path = COALESCE(excluded.audio_path, items.audio_path),
                    thumbnail_path = COALESCE(excluded.thumbnail_path, items.thumbnail_path),
                    updated_at = CURRENT_TIMESTAMP
            "#,
            )
            .bind(feed_id)
            .bind(&draft.guid)
            .bind(&draft.title)
            .bind(&draft.link)
            .bind(&draft.description)
            .bind(&draft.pub_date)
            .bind(&draft.author)
            .bind(&draft.content)
            .bind(&draft.categories)
            .bind(&draft.extensions)
            .bind(&draft.audio_path)
            .bind(&draft.thumbnail_path)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(drafts.len())
    }

    /// All items for a feed, newest first. `limit` of `None` returns everything.
    pub async fn get_items(
        &self,
        feed_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<CatalogItem>, DatabaseError> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM items
            WHERE feed_id = ?
            ORDER BY pub_date DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(feed_id)
        // SQLite treats a negative LIMIT as unbounded
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Items without audio that have a link to download from, newest first.
    pub async fn get_items_needing_download(
        &self,
        feed_id: i64,
        limit: i64,
    ) -> Result<Vec<CatalogItem>, DatabaseError> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM items
            WHERE feed_id = ? AND audio_path IS NULL AND link IS NOT NULL
            ORDER BY pub_date DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(feed_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Record downloaded media for an item. A `None` thumbnail keeps any stored one.
    ///
    /// Returns `false` when no item matched.
    pub async fn update_item_media(
        &self,
        feed_id: i64,
        guid: &str,
        audio_path: &str,
        thumbnail_path: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                audio_path = ?,
                thumbnail_path = COALESCE(?, thumbnail_path),
                updated_at = CURRENT_TIMESTAMP
            WHERE feed_id = ? AND guid = ?
        "#,
        )
        .bind(audio_path)
        .bind(thumbnail_path)
        .bind(feed_id)
        .bind(guid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rss::RssChannel;

    async fn setup() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let feed = db
            .get_or_create_feed("https://example.com/feed", &RssChannel::default())
            .await
            .unwrap();
        (db, feed.id)
    }

    fn draft(guid: &str, pub_date: &str, link: Option<&str>) -> ItemDraft {
        ItemDraft {
            guid: guid.into(),
            title: Some(guid.to_uppercase()),
            link: link.map(str::to_owned),
            description: format!("About {}", guid),
            pub_date: Some(pub_date.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (db, feed_id) = setup().await;
        let drafts = vec![
            draft("a", "2024-03-01T00:00:00.000Z", Some("https://youtu.be/a")),
            draft("b", "2024-03-02T00:00:00.000Z", Some("https://youtu.be/b")),
        ];

        assert_eq!(db.upsert_items(feed_id, &drafts).await.unwrap(), 2);
        assert_eq!(db.upsert_items(feed_id, &drafts).await.unwrap(), 2);

        let items = db.get_items(feed_id, None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].guid, "b");
        assert_eq!(items[1].guid, "a");
    }

    #[tokio::test]
    async fn test_upsert_preserves_media_paths() {
        let (db, feed_id) = setup().await;
        let original = draft("a", "2024-03-01T00:00:00.000Z", Some("https://youtu.be/a"));
        db.upsert_items(feed_id, &[original.clone()]).await.unwrap();

        assert!(db
            .update_item_media(feed_id, "a", "/media/1/a/audio.mp3", Some("/media/1/a/thumbnail.jpg"))
            .await
            .unwrap());

        let mut changed = original;
        changed.description = "Updated".into();
        db.upsert_items(feed_id, &[changed]).await.unwrap();

        let items = db.get_items(feed_id, None).await.unwrap();
        assert_eq!(items[0].description, "Updated");
        assert_eq!(items[0].audio_path.as_deref(), Some("/media/1/a/audio.mp3"));
        assert_eq!(
            items[0].thumbnail_path.as_deref(),
            Some("/media/1/a/thumbnail.jpg")
        );
    }

    #[tokio::test]
    async fn test_update_item_media_keeps_thumbnail_when_none() {
        let (db, feed_id) = setup().await;
        db.upsert_items(feed_id, &[draft("a", "2024-03-01T00:00:00.000Z", Some("l"))])
            .await
            .unwrap();

        db.update_item_media(feed_id, "a", "/m/a.mp3", Some("/m/a.jpg")).await.unwrap();
        db.update_item_media(feed_id, "a", "/m/a2.mp3", None).await.unwrap();

        let items = db.get_items(feed_id, None).await.unwrap();
        assert_eq!(items[0].audio_path.as_deref(), Some("/m/a2.mp3"));
        assert_eq!(items[0].thumbnail_path.as_deref(), Some("/m/a.jpg"));
        assert!(!db.update_item_media(feed_id, "missing", "/x", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_items_needing_download() {
        let (db, feed_id) = setup().await;
        let drafts: Vec<ItemDraft> = (1..=7)
            .map(|i| {
                draft(
                    &format!("v{}", i),
                    &format!("2024-03-0{}T00:00:00.000Z", i),
                    Some("https://youtu.be/x"),
                )
            })
            .chain(std::iter::once(draft("nolink", "2024-03-09T00:00:00.000Z", None)))
            .collect();
        db.upsert_items(feed_id, &drafts).await.unwrap();
        db.update_item_media(feed_id, "v7", "/m/v7.mp3", None).await.unwrap();

        let pending = db.get_items_needing_download(feed_id, 5).await.unwrap();
        let guids: Vec<&str> = pending.iter().map(|i| i.guid.as_str()).collect();
        assert_eq!(guids, vec!["v6", "v5", "v4", "v3", "v2"]);
    }

    #[tokio::test]
    async fn test_get_items_limit() {
        let (db, feed_id) = setup().await;
        db.upsert_items(
            feed_id,
            &[
                draft("a", "2024-03-01T00:00:00.000Z", None),
                draft("b", "2024-03-02T00:00:00.000Z", None),
            ],
        )
        .await
        .unwrap();

        let items = db.get_items(feed_id, Some(1)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "b");
    }
}
