use chrono::SecondsFormat;
use thiserror::Error;

use crate::rss::RssItem;

// ============================================================================
// Error Types
// ============================================================================

/// Catalog errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A schema migration step failed; the migration was rolled back
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    /// A JSON column could not be encoded or decoded
    #[error("Invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Records
// ============================================================================

/// Persisted channel metadata, keyed by source URL.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogFeed {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub link: String,
    /// RFC 3339, UTC
    pub last_build_date: Option<String>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub image_url: Option<String>,
    pub image_title: Option<String>,
    pub image_link: Option<String>,
    /// JSON array of captured extension blocks
    pub extensions: Option<String>,
    /// JSON object of prefix → namespace URI
    pub namespaces: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted episode, keyed by `(feed_id, guid)`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub feed_id: i64,
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: String,
    /// RFC 3339 with millisecond precision, UTC
    pub pub_date: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    /// JSON array of categories
    pub categories: Option<String>,
    /// JSON array of captured extension blocks
    pub extensions: Option<String>,
    pub audio_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values written by an item upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: String,
    pub pub_date: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub categories: Option<String>,
    pub extensions: Option<String>,
    /// `None` never clears a stored path
    pub audio_path: Option<String>,
    /// `None` never clears a stored path
    pub thumbnail_path: Option<String>,
}

impl ItemDraft {
    /// Builds the upsert values for a converted item.
    ///
    /// The guid falls back to the link, then to `"<feed_id>-<title>"`.
    /// Media paths are left empty; they are only ever set by downloads.
    pub fn from_item(feed_id: i64, item: &RssItem) -> Result<Self, DatabaseError> {
        let guid = item
            .guid
            .clone()
            .filter(|g| !g.is_empty())
            .or_else(|| item.link.clone().filter(|l| !l.is_empty()))
            .unwrap_or_else(|| format!("{}-{}", feed_id, item.title.as_deref().unwrap_or("")));

        let categories = if item.categories.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&item.categories)?)
        };
        let extensions = if item.extensions.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&item.extensions)?)
        };

        Ok(Self {
            guid,
            title: item.title.clone(),
            link: item.link.clone(),
            description: item.description.clone(),
            pub_date: item
                .pub_date
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            author: item.author.clone(),
            content: item.content_encoded.clone(),
            categories,
            extensions,
            audio_path: None,
            thumbnail_path: None,
        })
    }
}
