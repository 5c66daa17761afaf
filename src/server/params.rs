use url::form_urlencoded;

use crate::filter::FilterSpec;

/// Query parameters shared by `/rss` and `/podcast`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedParams {
    pub url: String,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub filters: Vec<String>,
    /// Channel title override (`/podcast` only)
    pub title: Option<String>,
    /// Channel description override (`/podcast` only)
    pub description: Option<String>,
}

impl FeedParams {
    /// Parses a raw query string.
    ///
    /// Returns `None` unless `url` is given exactly once and is non-empty.
    /// List parameters accept comma-separated values and repeated keys; their
    /// values are lower-cased and empty terms dropped.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let pairs: Vec<(String, String)> = form_urlencoded::parse(query?.as_bytes())
            .into_owned()
            .collect();

        let url = single(&pairs, "url")?;

        Some(Self {
            url,
            includes: list(&pairs, "includetext"),
            excludes: list(&pairs, "excludetext"),
            filters: list(&pairs, "filter"),
            title: single(&pairs, "title"),
            description: single(&pairs, "description"),
        })
    }

    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(
            self.includes.clone(),
            self.excludes.clone(),
            self.filters.clone(),
        )
    }
}

fn single(pairs: &[(String, String)], name: &str) -> Option<String> {
    let mut values = pairs.iter().filter(|(k, _)| k == name).map(|(_, v)| v);
    match (values.next(), values.next()) {
        (Some(value), None) if !value.is_empty() => Some(value.clone()),
        _ => None,
    }
}

/// Comma-separated terms of every `name` parameter, lower-cased. Surrounding
/// whitespace is part of the term; only empty terms are dropped.
fn list(pairs: &[(String, String)], name: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == name)
        .flat_map(|(_, v)| v.split(','))
        .map(|term| term.to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_url_is_none() {
        assert_eq!(FeedParams::from_query(None), None);
        assert_eq!(FeedParams::from_query(Some("filter=shorts")), None);
        assert_eq!(FeedParams::from_query(Some("url=")), None);
        assert_eq!(FeedParams::from_query(Some("url=a&url=b")), None);
    }

    #[test]
    fn test_lists_split_and_lowercase() {
        let params = FeedParams::from_query(Some(
            "url=https%3A%2F%2Fexample.com%2Ffeed%3Fchannel_id%3DUC1&includetext=Rust,Tokio&includetext=ASYNC&excludetext=live&filter=shorts,Country",
        ))
        .unwrap();

        assert_eq!(params.url, "https://example.com/feed?channel_id=UC1");
        assert_eq!(params.includes, vec!["rust", "tokio", "async"]);
        assert_eq!(params.excludes, vec!["live"]);
        assert_eq!(params.filters, vec!["shorts", "country"]);
        assert_eq!(params.title, None);
    }

    #[test]
    fn test_overrides_and_empty_terms() {
        let params = FeedParams::from_query(Some(
            "url=u&title=My+Show&description=&excludetext=a,,b",
        ))
        .unwrap();

        assert_eq!(params.title.as_deref(), Some("My Show"));
        assert_eq!(params.description, None);
        assert_eq!(params.excludes, vec!["a", "b"]);
    }

    #[test]
    fn test_list_terms_keep_surrounding_spaces() {
        let params = FeedParams::from_query(Some(
            "url=u&includetext=%20Foo&excludetext=live+,+now&filter=shorts,%20country",
        ))
        .unwrap();

        assert_eq!(params.includes, vec![" foo"]);
        assert_eq!(params.excludes, vec!["live ", " now"]);
        assert_eq!(params.filters, vec!["shorts", " country"]);
    }
}
