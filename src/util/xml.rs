use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

/// Errors raised while serializing an output feed document.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("XML write failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialized document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Thin wrapper over an indenting `quick_xml::Writer` that writes into memory.
pub(crate) struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    pub(crate) fn new() -> Result<Self, SerializeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    pub(crate) fn open(&mut self, start: BytesStart<'_>) -> Result<(), SerializeError> {
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<(), SerializeError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes `<name attrs...>value</name>`, escaping the value.
    pub(crate) fn text(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        value: &str,
    ) -> Result<(), SerializeError> {
        self.writer
            .create_element(name)
            .with_attributes(attributes.iter().copied())
            .write_text_content(BytesText::new(value))?;
        Ok(())
    }

    /// Writes `<name attrs.../>`.
    pub(crate) fn empty(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> Result<(), SerializeError> {
        self.writer
            .create_element(name)
            .with_attributes(attributes.iter().copied())
            .write_empty()?;
        Ok(())
    }

    /// Writes `<name attrs...>fragment</name>` with an already-serialized
    /// fragment as the element's content.
    pub(crate) fn markup(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        fragment: &str,
    ) -> Result<(), SerializeError> {
        let mut start = BytesStart::new(name);
        start.extend_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(fragment)))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes an already-serialized element verbatim on its own line.
    ///
    /// The bytes bypass the writer's event state, so the next element still
    /// starts on a fresh indented line.
    pub(crate) fn raw(&mut self, fragment: &str) -> Result<(), SerializeError> {
        self.writer.write_indent()?;
        self.writer.get_mut().extend_from_slice(fragment.as_bytes());
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<String, SerializeError> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped_and_raw_is_not() {
        let mut doc = XmlDocument::new().unwrap();
        doc.open(BytesStart::new("root")).unwrap();
        doc.text("title", &[("type", "text")], "Tom & Jerry <3").unwrap();
        doc.raw("<media:group><media:title>x</media:title></media:group>")
            .unwrap();
        doc.empty("link", &[("href", "https://example.com/?a=1&b=2")])
            .unwrap();
        doc.close("root").unwrap();
        let xml = doc.finish().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<title type=\"text\">Tom &amp; Jerry &lt;3</title>"));
        assert!(xml.contains("<media:group><media:title>x</media:title></media:group>"));
        assert!(xml.contains("href=\"https://example.com/?a=1&amp;b=2\""));
    }

    #[test]
    fn test_raw_fragment_on_its_own_indented_line() {
        let mut doc = XmlDocument::new().unwrap();
        doc.open(BytesStart::new("root")).unwrap();
        doc.open(BytesStart::new("entry")).unwrap();
        doc.text("title", &[], "x").unwrap();
        doc.raw("<foo:bar>y</foo:bar>").unwrap();
        doc.close("entry").unwrap();
        doc.empty("link", &[("href", "a")]).unwrap();
        doc.close("root").unwrap();
        let xml = doc.finish().unwrap();

        assert!(xml.contains("    <title>x</title>\n    <foo:bar>y</foo:bar>\n  </entry>"));
        assert!(xml.contains("</entry>\n  <link href=\"a\"/>\n</root>"));
    }

    #[test]
    fn test_markup_content_is_inline_and_unescaped() {
        let mut doc = XmlDocument::new().unwrap();
        doc.open(BytesStart::new("root")).unwrap();
        doc.markup("content", &[("type", "xhtml")], "<div><p>Hi <b>there</b></p></div>")
            .unwrap();
        doc.close("root").unwrap();
        let xml = doc.finish().unwrap();

        assert!(xml.contains(
            "\n  <content type=\"xhtml\"><div><p>Hi <b>there</b></p></div></content>\n</root>"
        ));
    }
}
