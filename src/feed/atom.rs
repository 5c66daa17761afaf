use chrono::SecondsFormat;
use quick_xml::events::BytesStart;

use super::model::{
    parse_timestamp, Category, Link, NormalizedEntry, NormalizedFeed, Person, Text,
};
use crate::util::{SerializeError, XmlDocument};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Serializes a (filtered) feed back to Atom.
///
/// Namespace declarations of the source root are re-declared so that captured
/// extension blocks stay well-formed. Timestamps that do not parse are left
/// out; valid ones are normalized to RFC 3339 in UTC.
pub fn write_atom(feed: &NormalizedFeed) -> Result<String, SerializeError> {
    let mut doc = XmlDocument::new()?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NAMESPACE));
    for (prefix, uri) in &feed.namespaces {
        if uri == ATOM_NAMESPACE {
            continue;
        }
        let key = format!("xmlns:{}", prefix);
        root.push_attribute((key.as_str(), uri.as_str()));
    }
    doc.open(root)?;

    if !feed.id.is_empty() {
        doc.text("id", &[], &feed.id)?;
    }
    write_text(&mut doc, "title", &feed.title)?;
    if let Some(subtitle) = &feed.subtitle {
        write_text(&mut doc, "subtitle", subtitle)?;
    }
    write_timestamp(&mut doc, "updated", feed.updated.as_deref())?;
    write_links(&mut doc, &feed.links)?;
    write_people(&mut doc, "author", &feed.authors)?;
    write_people(&mut doc, "contributor", &feed.contributors)?;
    write_categories(&mut doc, &feed.categories)?;
    if let Some(generator) = &feed.generator {
        let mut attrs = Vec::new();
        if let Some(uri) = &generator.uri {
            attrs.push(("uri", uri.as_str()));
        }
        if let Some(version) = &generator.version {
            attrs.push(("version", version.as_str()));
        }
        doc.text("generator", &attrs, &generator.value)?;
    }
    if let Some(icon) = &feed.icon {
        doc.text("icon", &[], icon)?;
    }
    if let Some(logo) = &feed.logo {
        doc.text("logo", &[], logo)?;
    }
    if let Some(rights) = &feed.rights {
        write_text(&mut doc, "rights", rights)?;
    }
    for extension in &feed.extensions {
        doc.raw(&extension.xml)?;
    }

    for entry in &feed.entries {
        write_entry(&mut doc, entry)?;
    }

    doc.close("feed")?;
    doc.finish()
}

fn write_entry(doc: &mut XmlDocument, entry: &NormalizedEntry) -> Result<(), SerializeError> {
    doc.open(BytesStart::new("entry"))?;

    doc.text("id", &[], &entry.id)?;
    write_text(doc, "title", &entry.title)?;
    write_links(doc, &entry.links)?;
    write_timestamp(doc, "published", entry.published.as_deref())?;
    write_timestamp(doc, "updated", entry.updated.as_deref())?;
    write_people(doc, "author", &entry.authors)?;
    write_people(doc, "contributor", &entry.contributors)?;
    write_categories(doc, &entry.categories)?;
    if let Some(summary) = &entry.summary {
        write_text(doc, "summary", summary)?;
    }
    if let Some(content) = &entry.content {
        write_text(doc, "content", content)?;
    }
    if let Some(rights) = &entry.rights {
        write_text(doc, "rights", rights)?;
    }
    for extension in &entry.extensions {
        doc.raw(&extension.xml)?;
    }

    doc.close("entry")
}

/// `xhtml` constructs already hold markup and are written back unescaped.
fn write_text(doc: &mut XmlDocument, name: &str, text: &Text) -> Result<(), SerializeError> {
    match text.kind.as_deref() {
        Some("xhtml") => doc.markup(name, &[("type", "xhtml")], &text.value),
        Some(kind) => doc.text(name, &[("type", kind)], &text.value),
        None => doc.text(name, &[], &text.value),
    }
}

fn write_timestamp(
    doc: &mut XmlDocument,
    name: &str,
    raw: Option<&str>,
) -> Result<(), SerializeError> {
    match raw.and_then(parse_timestamp) {
        Some(ts) => doc.text(name, &[], &ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Ok(()),
    }
}

fn write_links(doc: &mut XmlDocument, links: &[Link]) -> Result<(), SerializeError> {
    for link in links {
        let mut attrs = vec![("href", link.href.as_str())];
        if let Some(rel) = &link.rel {
            attrs.push(("rel", rel.as_str()));
        }
        if let Some(media_type) = &link.media_type {
            attrs.push(("type", media_type.as_str()));
        }
        if let Some(title) = &link.title {
            attrs.push(("title", title.as_str()));
        }
        doc.empty("link", &attrs)?;
    }
    Ok(())
}

fn write_people(
    doc: &mut XmlDocument,
    element: &str,
    people: &[Person],
) -> Result<(), SerializeError> {
    for person in people {
        doc.open(BytesStart::new(element))?;
        doc.text("name", &[], &person.name)?;
        if let Some(email) = &person.email {
            doc.text("email", &[], email)?;
        }
        if let Some(uri) = &person.uri {
            doc.text("uri", &[], uri)?;
        }
        doc.close(element)?;
    }
    Ok(())
}

fn write_categories(doc: &mut XmlDocument, categories: &[Category]) -> Result<(), SerializeError> {
    for category in categories {
        let mut attrs = vec![("term", category.term.as_str())];
        if let Some(scheme) = &category.scheme {
            attrs.push(("scheme", scheme.as_str()));
        }
        if let Some(label) = &category.label {
            attrs.push(("label", label.as_str()));
        }
        doc.empty("category", &attrs)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::{Extension, ParsedFeed};
    use crate::feed::parse_feed;
    use std::collections::BTreeMap;

    fn sample_feed() -> NormalizedFeed {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("media".to_string(), "http://search.yahoo.com/mrss/".to_string());

        NormalizedFeed {
            id: "yt:channel:UC123".into(),
            title: Text::plain("Channel & Co"),
            updated: Some("2024-03-01T12:00:00+02:00".into()),
            links: vec![Link {
                href: "https://www.youtube.com/channel/UC123".into(),
                rel: Some("alternate".into()),
                ..Default::default()
            }],
            namespaces,
            entries: vec![
                NormalizedEntry {
                    id: "yt:video:abc".into(),
                    title: Text::plain("Valid"),
                    updated: Some("2024-03-01T10:00:00Z".into()),
                    published: Some("garbage".into()),
                    extensions: vec![Extension {
                        name: "media:group".into(),
                        xml: "<media:group><media:title>Valid</media:title></media:group>".into(),
                    }],
                    ..Default::default()
                },
                NormalizedEntry {
                    id: "yt:video:def".into(),
                    title: Text::plain("Second"),
                    updated: Some("not a date".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_write_atom_declares_namespaces() {
        let xml = write_atom(&sample_feed()).unwrap();
        assert!(xml.contains(r#"xmlns="http://www.w3.org/2005/Atom""#));
        assert!(xml.contains(r#"xmlns:media="http://search.yahoo.com/mrss/""#));
        assert!(xml.contains("<title>Channel &amp; Co</title>"));
    }

    #[test]
    fn test_write_atom_normalizes_and_drops_timestamps() {
        let xml = write_atom(&sample_feed()).unwrap();
        assert!(xml.contains("<updated>2024-03-01T10:00:00Z</updated>"));
        assert!(!xml.contains("garbage"));
        assert!(!xml.contains("not a date"));
        assert!(!xml.contains("<published>"));
    }

    #[test]
    fn test_write_atom_reparses_with_extensions() {
        let xml = write_atom(&sample_feed()).unwrap();
        let reparsed = match parse_feed(xml.as_bytes()).unwrap() {
            ParsedFeed::Supported(feed) => feed,
            other => panic!("Expected supported feed, got {:?}", other),
        };

        assert_eq!(reparsed.entries.len(), 2);
        assert_eq!(reparsed.entries[0].id, "yt:video:abc");
        assert_eq!(reparsed.entries[0].extensions[0].name, "media:group");
        assert_eq!(reparsed.entries[1].updated, None);
    }

    fn reparse(xml: &str) -> NormalizedFeed {
        match parse_feed(xml.as_bytes()).unwrap() {
            ParsedFeed::Supported(feed) => feed,
            other => panic!("Expected supported feed, got {:?}", other),
        }
    }

    #[test]
    fn test_xhtml_content_round_trips_as_markup() {
        let source = r#"<feed xmlns="http://www.w3.org/2005/Atom"><id>f</id><entry><id>1</id>
<content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div></content>
</entry></feed>"#;
        let xml = write_atom(&reparse(source)).unwrap();

        assert!(xml.contains(
            r#"<content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div></content>"#
        ));
        let content = reparse(&xml).entries[0].content.clone().unwrap();
        assert_eq!(
            content.value,
            r#"<div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div>"#
        );
    }

    #[test]
    fn test_contributors_written_after_authors() {
        let mut feed = sample_feed();
        feed.contributors.push(Person {
            name: "Alice".into(),
            ..Default::default()
        });
        feed.entries[0].authors.push(Person {
            name: "Carol".into(),
            ..Default::default()
        });
        feed.entries[0].contributors.push(Person {
            name: "Bob".into(),
            email: Some("bob@example.com".into()),
            ..Default::default()
        });
        let xml = write_atom(&feed).unwrap();

        let author = xml.find("<name>Carol</name>").unwrap();
        let contributor = xml.find("<name>Bob</name>").unwrap();
        assert!(author < contributor);

        let reparsed = reparse(&xml);
        assert_eq!(reparsed.contributors[0].name, "Alice");
        assert_eq!(reparsed.entries[0].authors[0].name, "Carol");
        assert_eq!(reparsed.entries[0].contributors[0].name, "Bob");
        assert_eq!(
            reparsed.entries[0].contributors[0].email.as_deref(),
            Some("bob@example.com")
        );
    }

    #[test]
    fn test_entry_scoped_extension_stays_declared() {
        let source = r#"<feed xmlns="http://www.w3.org/2005/Atom"><id>f</id>
<entry xmlns:foo="urn:foo"><id>1</id><title>T</title><foo:bar>x</foo:bar></entry></feed>"#;
        let xml = write_atom(&reparse(source)).unwrap();

        assert!(xml.contains("    <title>T</title>\n    <foo:bar xmlns:foo=\"urn:foo\">x</foo:bar>\n  </entry>"));
        let reparsed = reparse(&xml);
        assert_eq!(reparsed.entries[0].extensions[0].name, "foo:bar");
    }
}
