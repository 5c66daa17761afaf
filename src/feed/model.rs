use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Atom text construct: the text itself plus its declared `type` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Text {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: None,
        }
    }

    /// Returns the text value when it is not blank.
    pub fn non_empty(&self) -> Option<&str> {
        let value = self.value.as_str();
        (!value.trim().is_empty()).then_some(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A namespaced element carried through untouched (media:group, yt:videoId, ...).
///
/// `xml` holds the complete element as it appeared in the source, so it can be
/// re-emitted verbatim as long as the output declares the same prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Qualified element name, e.g. `media:group`
    pub name: String,
    pub xml: String,
}

impl Extension {
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }
}

/// One entry of a supported source feed, before filtering.
///
/// Timestamps stay in their raw string form; see [`parse_timestamp`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    pub id: String,
    pub title: Text,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Text>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Text>,
    pub authors: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Person>,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<Text>,
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFeed {
    pub id: String,
    pub title: Text,
    pub subtitle: Option<Text>,
    pub updated: Option<String>,
    pub links: Vec<Link>,
    pub authors: Vec<Person>,
    pub contributors: Vec<Person>,
    pub categories: Vec<Category>,
    pub logo: Option<String>,
    pub icon: Option<String>,
    pub rights: Option<Text>,
    pub generator: Option<Generator>,
    /// Prefix → namespace URI declarations found on the source root element
    pub namespaces: BTreeMap<String, String>,
    pub extensions: Vec<Extension>,
    pub entries: Vec<NormalizedEntry>,
}

/// Result of parsing a fetched body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFeed {
    Supported(NormalizedFeed),
    /// A recognized feed in a dialect this service does not republish
    Unsupported { dialect: String },
}

/// Parses a feed timestamp leniently.
///
/// Accepts RFC 3339, RFC 2822, a bare `YYYY-MM-DD` date and a zone-less
/// `YYYY-MM-DDTHH:MM:SS` (read as UTC). Anything else is treated as absent,
/// never as an error and never as a sentinel value.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_rfc2822() {
        let parsed = parse_timestamp("Fri, 01 Mar 2024 12:30:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_date_only() {
        let parsed = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_invalid_is_absent() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-45T99:00:00Z").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_extension_prefix() {
        let ext = Extension {
            name: "media:group".to_string(),
            xml: "<media:group/>".to_string(),
        };
        assert_eq!(ext.prefix(), Some("media"));
    }
}
