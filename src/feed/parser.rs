use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use thiserror::Error;

use super::model::{
    Category, Extension, Generator, Link, NormalizedEntry, NormalizedFeed, ParsedFeed, Person,
    Text,
};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Errors for bodies that could not be read as any feed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body of an Atom document is not UTF-8
    #[error("Feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// XML syntax error inside an Atom document
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("Failed to capture extension element: {0}")]
    Io(#[from] std::io::Error),
    /// Structurally broken document, or not a feed at all
    #[error("Malformed feed: {0}")]
    Malformed(String),
}

/// Parses a fetched body into a [`ParsedFeed`].
///
/// Documents whose root element is `<feed>` are read as Atom. Everything else
/// is handed to `feed-rs` purely to classify it: a recognized RSS or JSON feed
/// becomes [`ParsedFeed::Unsupported`], anything unreadable is a [`ParseError`].
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if root_element(bytes).as_deref() == Some("feed") {
        let text = std::str::from_utf8(bytes)?;
        return AtomReader::new(text).read().map(ParsedFeed::Supported);
    }

    match feed_rs::parser::parse(bytes) {
        Ok(feed) => Ok(ParsedFeed::Unsupported {
            dialect: format!("{:?}", feed.feed_type).to_lowercase(),
        }),
        Err(e) => Err(ParseError::Malformed(e.to_string())),
    }
}

/// Local name of the first element in the document, if it can be reached.
fn root_element(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    loop {
        match reader.read_event().ok()? {
            Event::Start(start) | Event::Empty(start) => return Some(local_name(&start)),
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn qualified_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>, ParseError> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `xmlns` and `xmlns:prefix` attributes of one element. The default
/// namespace is keyed by `None`.
fn declarations(start: &BytesStart<'_>) -> Result<Vec<Binding>, ParseError> {
    let mut bindings = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let prefix = match key.strip_prefix("xmlns") {
            Some("") => None,
            Some(rest) => match rest.strip_prefix(':') {
                Some(prefix) => Some(prefix.to_string()),
                None => continue,
            },
            None => continue,
        };
        bindings.push((prefix, attr.unescape_value()?.into_owned()));
    }
    Ok(bindings)
}

type Binding = (Option<String>, String);

fn link_from(start: &BytesStart<'_>) -> Result<Link, ParseError> {
    Ok(Link {
        href: attribute(start, "href")?.unwrap_or_default(),
        rel: attribute(start, "rel")?,
        media_type: attribute(start, "type")?,
        title: attribute(start, "title")?,
    })
}

fn category_from(start: &BytesStart<'_>) -> Result<Category, ParseError> {
    Ok(Category {
        term: attribute(start, "term")?.unwrap_or_default(),
        scheme: attribute(start, "scheme")?,
        label: attribute(start, "label")?,
    })
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Pull reader over an Atom document.
///
/// Atom elements are mapped onto the normalized model. Elements in any other
/// namespace are captured whole as [`Extension`]s so they survive conversion.
struct AtomReader<'a> {
    reader: Reader<&'a [u8]>,
    /// Namespace bindings of the open `<feed>` and `<entry>` elements, outermost first
    scopes: Vec<Vec<Binding>>,
}

impl<'a> AtomReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            reader: Reader::from_str(text),
            scopes: Vec::new(),
        }
    }

    fn read(mut self) -> Result<NormalizedFeed, ParseError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) if local_name(&start) == "feed" => {
                    let mut feed = NormalizedFeed::default();
                    self.open_scope(&start, &mut feed)?;
                    self.read_feed(&mut feed)?;
                    return Ok(feed);
                }
                Event::Empty(start) if local_name(&start) == "feed" => {
                    let mut feed = NormalizedFeed::default();
                    self.open_scope(&start, &mut feed)?;
                    return Ok(feed);
                }
                Event::Eof => {
                    return Err(ParseError::Malformed("missing <feed> root element".into()))
                }
                _ => {}
            }
        }
    }

    fn open_scope(
        &mut self,
        start: &BytesStart<'_>,
        feed: &mut NormalizedFeed,
    ) -> Result<(), ParseError> {
        let bindings = declarations(start)?;
        feed.namespaces = bindings
            .iter()
            .filter_map(|(prefix, uri)| Some((prefix.clone()?, uri.clone())))
            .collect();
        self.scopes.push(bindings);
        Ok(())
    }

    /// Namespace URI bound to `prefix` at the current position, looking at
    /// the element's own declarations before the enclosing scopes.
    fn resolve(&self, own: &[Binding], prefix: Option<&str>) -> Option<String> {
        own.iter()
            .chain(self.scopes.iter().rev().flatten())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
    }

    /// Prefixed elements are extensions unless bound to Atom. Unprefixed
    /// elements are Atom unless a default namespace says otherwise.
    fn is_extension(&self, start: &BytesStart<'_>) -> Result<bool, ParseError> {
        let own = declarations(start)?;
        let extension = match start.name().prefix() {
            Some(prefix) => {
                let prefix = String::from_utf8_lossy(prefix.as_ref());
                self.resolve(&own, Some(&*prefix)).as_deref() != Some(ATOM_NAMESPACE)
            }
            None => matches!(
                self.resolve(&own, None).as_deref(),
                Some(uri) if !uri.is_empty() && uri != ATOM_NAMESPACE
            ),
        };
        Ok(extension)
    }

    fn read_feed(&mut self, feed: &mut NormalizedFeed) -> Result<(), ParseError> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => {
                    if self.is_extension(&start)? {
                        let extension = self.capture_extension(start, false)?;
                        feed.extensions.push(extension);
                        continue;
                    }
                    match local_name(&start).as_str() {
                        "id" => feed.id = self.read_text()?.trim().to_string(),
                        "title" => feed.title = self.read_text_construct(&start)?,
                        "subtitle" => feed.subtitle = Some(self.read_text_construct(&start)?),
                        "updated" => feed.updated = non_blank(self.read_text()?),
                        "logo" => feed.logo = non_blank(self.read_text()?),
                        "icon" => feed.icon = non_blank(self.read_text()?),
                        "rights" => feed.rights = Some(self.read_text_construct(&start)?),
                        "generator" => {
                            let uri = attribute(&start, "uri")?;
                            let version = attribute(&start, "version")?;
                            feed.generator = Some(Generator {
                                value: self.read_text()?.trim().to_string(),
                                uri,
                                version,
                            });
                        }
                        "author" => feed.authors.push(self.read_person()?),
                        "contributor" => feed.contributors.push(self.read_person()?),
                        "link" => {
                            feed.links.push(link_from(&start)?);
                            self.skip(&start)?;
                        }
                        "category" => {
                            feed.categories.push(category_from(&start)?);
                            self.skip(&start)?;
                        }
                        "entry" => {
                            self.scopes.push(declarations(&start)?);
                            let entry = self.read_entry();
                            self.scopes.pop();
                            feed.entries.push(entry?);
                        }
                        _ => self.skip(&start)?,
                    }
                }
                Event::Empty(start) => {
                    if self.is_extension(&start)? {
                        let extension = self.capture_extension(start, true)?;
                        feed.extensions.push(extension);
                        continue;
                    }
                    match local_name(&start).as_str() {
                        "link" => feed.links.push(link_from(&start)?),
                        "category" => feed.categories.push(category_from(&start)?),
                        _ => {}
                    }
                }
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(ParseError::Malformed("unexpected end of feed".into())),
                _ => {}
            }
        }
    }

    fn read_entry(&mut self) -> Result<NormalizedEntry, ParseError> {
        let mut entry = NormalizedEntry::default();
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => {
                    if self.is_extension(&start)? {
                        let extension = self.capture_extension(start, false)?;
                        entry.extensions.push(extension);
                        continue;
                    }
                    match local_name(&start).as_str() {
                        "id" => entry.id = self.read_text()?.trim().to_string(),
                        "title" => entry.title = self.read_text_construct(&start)?,
                        "summary" => entry.summary = Some(self.read_text_construct(&start)?),
                        "content" => entry.content = Some(self.read_text_construct(&start)?),
                        "updated" => entry.updated = non_blank(self.read_text()?),
                        "published" => entry.published = non_blank(self.read_text()?),
                        "rights" => entry.rights = Some(self.read_text_construct(&start)?),
                        "author" => entry.authors.push(self.read_person()?),
                        "contributor" => entry.contributors.push(self.read_person()?),
                        "link" => {
                            entry.links.push(link_from(&start)?);
                            self.skip(&start)?;
                        }
                        "category" => {
                            entry.categories.push(category_from(&start)?);
                            self.skip(&start)?;
                        }
                        _ => self.skip(&start)?,
                    }
                }
                Event::Empty(start) => {
                    if self.is_extension(&start)? {
                        let extension = self.capture_extension(start, true)?;
                        entry.extensions.push(extension);
                        continue;
                    }
                    match local_name(&start).as_str() {
                        "link" => entry.links.push(link_from(&start)?),
                        "category" => entry.categories.push(category_from(&start)?),
                        _ => {}
                    }
                }
                Event::End(_) => return Ok(entry),
                Event::Eof => {
                    return Err(ParseError::Malformed("unexpected end of entry".into()))
                }
                _ => {}
            }
        }
    }

    fn read_person(&mut self) -> Result<Person, ParseError> {
        let mut person = Person::default();
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => match local_name(&start).as_str() {
                    "name" => person.name = self.read_text()?.trim().to_string(),
                    "email" => person.email = non_blank(self.read_text()?),
                    "uri" => person.uri = non_blank(self.read_text()?),
                    _ => self.skip(&start)?,
                },
                Event::End(_) => return Ok(person),
                Event::Eof => {
                    return Err(ParseError::Malformed("unexpected end of person".into()))
                }
                _ => {}
            }
        }
    }

    /// Reads `text` and `html` constructs as character data. An `xhtml`
    /// construct keeps its child markup as written.
    fn read_text_construct(&mut self, start: &BytesStart<'_>) -> Result<Text, ParseError> {
        let kind = attribute(start, "type")?;
        let value = if kind.as_deref() == Some("xhtml") {
            let mut writer = Writer::new(Vec::new());
            self.copy_children(&mut writer, &qualified_name(start), false)?;
            String::from_utf8(writer.into_inner())
                .map_err(|e| ParseError::Malformed(e.to_string()))?
        } else {
            self.read_text()?
        };
        Ok(Text { value, kind })
    }

    /// Collects the character data of the current element, descending into
    /// nested markup, and consumes its end tag. Whitespace is kept as is.
    fn read_text(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(text),
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(ParseError::Malformed("unexpected end of text element".into()))
                }
                _ => {}
            }
        }
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<(), ParseError> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }

    /// Writes every event up to the end tag of the element `name`, which has
    /// already been read. The end tag itself is written only when `with_end`.
    fn copy_children(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        name: &str,
        with_end: bool,
    ) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            let event = self.reader.read_event()?;
            let closes = match &event {
                Event::Start(_) => {
                    depth += 1;
                    false
                }
                Event::End(_) if depth == 0 => true,
                Event::End(_) => {
                    depth -= 1;
                    false
                }
                Event::Eof => {
                    return Err(ParseError::Malformed(format!(
                        "unexpected end inside <{}>",
                        name
                    )))
                }
                _ => false,
            };
            if closes && !with_end {
                return Ok(());
            }
            writer.write_event(event)?;
            if closes {
                return Ok(());
            }
        }
    }

    /// Re-serializes the element starting at `start` (and its subtree) verbatim.
    ///
    /// Bindings declared on an enclosing `<entry>`, and an inherited non-Atom
    /// default namespace, are copied onto the captured element so the
    /// fragment stays well-formed once it is lifted out of its context.
    fn capture_extension(
        &mut self,
        mut start: BytesStart<'_>,
        empty: bool,
    ) -> Result<Extension, ParseError> {
        let name = qualified_name(&start);
        let own = declarations(&start)?;

        let mut inherited: BTreeMap<Option<String>, String> = BTreeMap::new();
        for (prefix, uri) in self.scopes.iter().skip(1).flatten() {
            inherited.insert(prefix.clone(), uri.clone());
        }
        if start.name().prefix().is_none() {
            if let Some(uri) = self.resolve(&[], None) {
                if uri != ATOM_NAMESPACE {
                    inherited.insert(None, uri);
                }
            }
        }
        for (prefix, uri) in inherited {
            if own.iter().any(|(p, _)| *p == prefix) {
                continue;
            }
            let key = match prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }

        let mut writer = Writer::new(Vec::new());
        if empty {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            self.copy_children(&mut writer, &name, true)?;
        }

        let xml = String::from_utf8(writer.into_inner())
            .map_err(|e| ParseError::Malformed(e.to_string()))?;
        Ok(Extension { name, xml })
    }
}
