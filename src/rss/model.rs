use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::feed::Extension;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssImage {
    pub url: String,
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Size in bytes; 0 when the file is not on disk
    pub length: u64,
    pub mime_type: String,
}

/// A converted feed entry.
///
/// `description` is always present (possibly empty), which keeps the
/// title-or-description requirement of RSS items satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: Option<String>,
    /// Retained for catalog keying; podcast output does not emit it
    pub link: Option<String>,
    pub description: String,
    pub guid: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub content_encoded: Option<String>,
    pub categories: Vec<RssCategory>,
    pub extensions: Vec<Extension>,
    pub enclosure: Option<Enclosure>,
    /// Servable artwork URL, rendered as `itunes:image`
    pub itunes_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub description: String,
    pub link: String,
    pub last_build_date: Option<DateTime<Utc>>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub image: Option<RssImage>,
    /// Channel artwork URL, rendered as `itunes:image`
    pub itunes_image: Option<String>,
    pub namespaces: BTreeMap<String, String>,
    pub extensions: Vec<Extension>,
    pub items: Vec<RssItem>,
}
