use super::model::{RssCategory, RssChannel, RssImage, RssItem};
use crate::feed::{parse_timestamp, NormalizedEntry, NormalizedFeed};
use crate::util::{video_id_from_entry_id, watch_url};

/// Converts a normalized Atom feed into the RSS channel model.
pub fn convert_feed(feed: &NormalizedFeed) -> RssChannel {
    let title = feed.title.value.clone();
    let link = feed
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let description = feed
        .subtitle
        .as_ref()
        .and_then(|s| s.non_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| title.clone());

    let image = feed.logo.as_ref().map(|logo| RssImage {
        url: logo.clone(),
        title: title.clone(),
        link: link.clone(),
    });

    RssChannel {
        description,
        last_build_date: feed.updated.as_deref().and_then(parse_timestamp),
        copyright: feed.rights.as_ref().map(|r| r.value.clone()),
        generator: feed.generator.as_ref().map(|g| g.value.clone()),
        image,
        itunes_image: None,
        namespaces: feed.namespaces.clone(),
        extensions: feed.extensions.clone(),
        items: feed.entries.iter().map(convert_entry).collect(),
        title,
        link,
    }
}

/// Converts a single entry.
///
/// The link falls back to the canonical watch URL when the entry has no links
/// but its id embeds a video identifier.
pub fn convert_entry(entry: &NormalizedEntry) -> RssItem {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| video_id_from_entry_id(&entry.id).map(watch_url));

    let description = entry
        .summary
        .as_ref()
        .and_then(|s| s.non_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.non_empty()))
        .or_else(|| entry.title.non_empty())
        .unwrap_or_default()
        .to_string();

    let author = entry.authors.first().and_then(|a| {
        a.email
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| (!a.name.is_empty()).then(|| a.name.clone()))
    });

    RssItem {
        title: entry.title.non_empty().map(str::to_owned),
        link,
        description,
        guid: (!entry.id.is_empty()).then(|| entry.id.clone()),
        pub_date: entry.updated.as_deref().and_then(parse_timestamp),
        author,
        content_encoded: entry.content.as_ref().map(|c| c.value.clone()),
        categories: entry
            .categories
            .iter()
            .map(|c| RssCategory {
                name: c.term.clone(),
                domain: c.scheme.clone(),
            })
            .collect(),
        extensions: entry.extensions.clone(),
        enclosure: None,
        itunes_image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Category, Generator, Link, Person, Text};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn feed() -> NormalizedFeed {
        NormalizedFeed {
            id: "yt:channel:UC1".into(),
            title: Text::plain("Channel"),
            updated: Some("2024-03-01T10:00:00Z".into()),
            links: vec![Link {
                href: "https://www.youtube.com/channel/UC1".into(),
                ..Default::default()
            }],
            logo: Some("https://example.com/logo.png".into()),
            generator: Some(Generator {
                value: "YouTube".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_convert_feed_fallbacks() {
        let channel = convert_feed(&feed());

        assert_eq!(channel.title, "Channel");
        assert_eq!(channel.description, "Channel");
        assert_eq!(channel.link, "https://www.youtube.com/channel/UC1");
        assert_eq!(
            channel.last_build_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(channel.generator.as_deref(), Some("YouTube"));
        assert_eq!(channel.copyright, None);
        assert_eq!(
            channel.image,
            Some(RssImage {
                url: "https://example.com/logo.png".into(),
                title: "Channel".into(),
                link: "https://www.youtube.com/channel/UC1".into(),
            })
        );
    }

    #[test]
    fn test_convert_feed_without_links_or_subtitle() {
        let mut source = feed();
        source.links.clear();
        source.subtitle = Some(Text::plain("About"));
        source.updated = Some("whenever".into());

        let channel = convert_feed(&source);
        assert_eq!(channel.link, "");
        assert_eq!(channel.description, "About");
        assert_eq!(channel.last_build_date, None);
    }

    #[test]
    fn test_convert_entry_full_mapping() {
        let entry = NormalizedEntry {
            id: "yt:video:abc".into(),
            title: Text::plain("Episode"),
            links: vec![Link {
                href: "https://www.youtube.com/watch?v=abc".into(),
                ..Default::default()
            }],
            summary: Some(Text::plain("Summary")),
            content: Some(Text {
                value: "<p>Body</p>".into(),
                kind: Some("html".into()),
            }),
            authors: vec![Person {
                name: "Host".into(),
                email: Some("host@example.com".into()),
                uri: None,
            }],
            categories: vec![Category {
                term: "tech".into(),
                scheme: Some("https://example.com/cat".into()),
                label: None,
            }],
            updated: Some("2024-03-01T10:00:00+01:00".into()),
            ..Default::default()
        };

        let item = convert_entry(&entry);
        assert_eq!(item.title.as_deref(), Some("Episode"));
        assert_eq!(item.link.as_deref(), Some("https://www.youtube.com/watch?v=abc"));
        assert_eq!(item.description, "Summary");
        assert_eq!(item.guid.as_deref(), Some("yt:video:abc"));
        assert_eq!(item.author.as_deref(), Some("host@example.com"));
        assert_eq!(item.content_encoded.as_deref(), Some("<p>Body</p>"));
        assert_eq!(
            item.categories,
            vec![RssCategory {
                name: "tech".into(),
                domain: Some("https://example.com/cat".into()),
            }]
        );
        assert_eq!(
            item.pub_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_convert_entry_link_from_video_id() {
        let entry = NormalizedEntry {
            id: "yt:video:xyz".into(),
            title: Text::plain("No links"),
            ..Default::default()
        };
        let item = convert_entry(&entry);
        assert_eq!(item.link.as_deref(), Some("https://www.youtube.com/watch?v=xyz"));
    }

    #[test]
    fn test_convert_entry_description_chain_and_omissions() {
        let entry = NormalizedEntry {
            id: String::new(),
            title: Text::plain("Only Title"),
            authors: vec![Person {
                name: "Name Only".into(),
                ..Default::default()
            }],
            updated: Some("bogus".into()),
            ..Default::default()
        };
        let item = convert_entry(&entry);
        assert_eq!(item.description, "Only Title");
        assert_eq!(item.guid, None);
        assert_eq!(item.link, None);
        assert_eq!(item.pub_date, None);
        assert_eq!(item.author.as_deref(), Some("Name Only"));

        let empty = convert_entry(&NormalizedEntry::default());
        assert_eq!(empty.title, None);
        assert_eq!(empty.description, "");
    }
}
