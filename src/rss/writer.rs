use quick_xml::events::BytesStart;

use super::model::{RssChannel, RssItem};
use crate::feed::Extension;
use crate::util::{SerializeError, XmlDocument};

pub const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Serializes a channel as RSS 2.0 with the iTunes and content namespaces.
///
/// Items carry no `<link>`; the enclosure is their only media reference.
pub fn write_rss(channel: &RssChannel) -> Result<String, SerializeError> {
    let mut doc = XmlDocument::new()?;

    let mut root = BytesStart::new("rss");
    root.push_attribute(("version", "2.0"));
    root.push_attribute(("xmlns:itunes", ITUNES_NAMESPACE));
    root.push_attribute(("xmlns:content", CONTENT_NAMESPACE));
    for (prefix, uri) in &channel.namespaces {
        if prefix == "itunes" || prefix == "content" || prefix == "atom" {
            continue;
        }
        let key = format!("xmlns:{}", prefix);
        root.push_attribute((key.as_str(), uri.as_str()));
    }
    doc.open(root)?;
    doc.open(BytesStart::new("channel"))?;

    doc.text("title", &[], &channel.title)?;
    doc.text("link", &[], &channel.link)?;
    doc.text("description", &[], &channel.description)?;
    if let Some(copyright) = &channel.copyright {
        doc.text("copyright", &[], copyright)?;
    }
    if let Some(date) = &channel.last_build_date {
        doc.text("lastBuildDate", &[], &date.to_rfc2822())?;
    }
    if let Some(generator) = &channel.generator {
        doc.text("generator", &[], generator)?;
    }
    if let Some(image) = &channel.image {
        doc.open(BytesStart::new("image"))?;
        doc.text("url", &[], &image.url)?;
        doc.text("title", &[], &image.title)?;
        doc.text("link", &[], &image.link)?;
        doc.close("image")?;
    }
    if let Some(href) = &channel.itunes_image {
        doc.empty("itunes:image", &[("href", href.as_str())])?;
    }
    write_extensions(&mut doc, &channel.extensions, channel.itunes_image.is_some())?;

    for item in &channel.items {
        write_item(&mut doc, item)?;
    }

    doc.close("channel")?;
    doc.close("rss")?;
    doc.finish()
}

fn write_item(doc: &mut XmlDocument, item: &RssItem) -> Result<(), SerializeError> {
    doc.open(BytesStart::new("item"))?;

    if let Some(title) = &item.title {
        doc.text("title", &[], title)?;
    }
    doc.text("description", &[], &item.description)?;
    if let Some(guid) = &item.guid {
        doc.text("guid", &[("isPermaLink", "false")], guid)?;
    }
    if let Some(date) = &item.pub_date {
        doc.text("pubDate", &[], &date.to_rfc2822())?;
    }
    if let Some(author) = &item.author {
        doc.text("author", &[], author)?;
    }
    for category in &item.categories {
        match &category.domain {
            Some(domain) => doc.text("category", &[("domain", domain.as_str())], &category.name)?,
            None => doc.text("category", &[], &category.name)?,
        }
    }
    if let Some(enclosure) = &item.enclosure {
        let length = enclosure.length.to_string();
        doc.empty(
            "enclosure",
            &[
                ("url", enclosure.url.as_str()),
                ("length", length.as_str()),
                ("type", enclosure.mime_type.as_str()),
            ],
        )?;
    }
    if let Some(content) = &item.content_encoded {
        doc.text("content:encoded", &[], content)?;
    }
    if let Some(href) = &item.itunes_image {
        doc.empty("itunes:image", &[("href", href.as_str())])?;
    }
    write_extensions(doc, &item.extensions, item.itunes_image.is_some())?;

    doc.close("item")
}

/// Writes captured extension blocks. Only prefixes declared on the root are
/// emitted; a source `itunes:image` is dropped when one was set explicitly.
fn write_extensions(
    doc: &mut XmlDocument,
    extensions: &[Extension],
    has_itunes_image: bool,
) -> Result<(), SerializeError> {
    for extension in extensions {
        if has_itunes_image && extension.name == "itunes:image" {
            continue;
        }
        // Atom-namespaced children would be undeclared inside RSS
        if extension.prefix() == Some("atom") {
            continue;
        }
        doc.raw(&extension.xml)?;
    }
    Ok(())
}
