use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::feed::Extension;
use crate::rss::{Enclosure, RssCategory, RssChannel, RssImage, RssItem};
use crate::storage::{CatalogFeed, CatalogItem, DatabaseError};

pub(crate) const AUDIO_MIME_TYPE: &str = "audio/mpeg";

fn parse_stored_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Rebuilds the channel from its stored metadata snapshot, without items.
pub(crate) fn channel_from_record(feed: &CatalogFeed) -> Result<RssChannel, DatabaseError> {
    let extensions: Vec<Extension> = match &feed.extensions {
        Some(json) => serde_json::from_str(json)?,
        None => Vec::new(),
    };
    let namespaces: BTreeMap<String, String> = match &feed.namespaces {
        Some(json) => serde_json::from_str(json)?,
        None => BTreeMap::new(),
    };

    let image = feed.image_url.as_ref().map(|url| RssImage {
        url: url.clone(),
        title: feed.image_title.clone().unwrap_or_else(|| feed.title.clone()),
        link: feed.image_link.clone().unwrap_or_else(|| feed.link.clone()),
    });

    Ok(RssChannel {
        title: feed.title.clone(),
        description: feed.description.clone(),
        link: feed.link.clone(),
        last_build_date: parse_stored_date(feed.last_build_date.as_deref()),
        copyright: feed.copyright.clone(),
        generator: feed.generator.clone(),
        image,
        itunes_image: None,
        namespaces,
        extensions,
        items: Vec::new(),
    })
}

/// Rebuilds an item from the catalog.
///
/// Media fields carry on-disk paths at this point; they are rewritten to
/// servable URLs before the channel is serialized.
pub(crate) fn item_from_record(item: &CatalogItem) -> Result<RssItem, DatabaseError> {
    let categories: Vec<RssCategory> = match &item.categories {
        Some(json) => serde_json::from_str(json)?,
        None => Vec::new(),
    };
    let extensions: Vec<Extension> = match &item.extensions {
        Some(json) => serde_json::from_str(json)?,
        None => Vec::new(),
    };

    Ok(RssItem {
        title: item.title.clone(),
        link: item.link.clone(),
        description: item.description.clone(),
        guid: Some(item.guid.clone()),
        pub_date: parse_stored_date(item.pub_date.as_deref()),
        author: item.author.clone(),
        content_encoded: item.content.clone(),
        categories,
        extensions,
        enclosure: item.audio_path.as_ref().map(|path| Enclosure {
            url: path.clone(),
            length: 0,
            mime_type: AUDIO_MIME_TYPE.to_string(),
        }),
        itunes_image: item.thumbnail_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> CatalogItem {
        CatalogItem {
            id: 1,
            feed_id: 1,
            guid: "yt:video:a".into(),
            title: Some("A".into()),
            link: Some("https://www.youtube.com/watch?v=a".into()),
            description: "About A".into(),
            pub_date: Some("2024-03-01T09:00:00.000Z".into()),
            author: None,
            content: None,
            categories: Some(r#"[{"name":"tech"}]"#.into()),
            extensions: None,
            audio_path: Some("/media/1/a/audio.mp3".into()),
            thumbnail_path: None,
            created_at: "2024-03-01 09:00:00".into(),
            updated_at: "2024-03-01 09:00:00".into(),
        }
    }

    #[test]
    fn test_item_from_record() {
        let item = item_from_record(&record()).unwrap();

        assert_eq!(item.guid.as_deref(), Some("yt:video:a"));
        assert_eq!(
            item.pub_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
        assert_eq!(item.categories[0].name, "tech");
        assert_eq!(item.categories[0].domain, None);
        let enclosure = item.enclosure.unwrap();
        assert_eq!(enclosure.url, "/media/1/a/audio.mp3");
        assert_eq!(enclosure.mime_type, "audio/mpeg");
        assert_eq!(item.itunes_image, None);
    }

    #[test]
    fn test_item_without_audio_has_no_enclosure() {
        let mut stored = record();
        stored.audio_path = None;
        assert!(item_from_record(&stored).unwrap().enclosure.is_none());
    }

    #[test]
    fn test_corrupt_json_column_is_error() {
        let mut stored = record();
        stored.categories = Some("not json".into());
        assert!(matches!(
            item_from_record(&stored),
            Err(DatabaseError::Json(_))
        ));
    }
}
