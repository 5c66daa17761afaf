//! Fetch → Parse → Filter, shared by the `/rss` and `/podcast` routes.

use thiserror::Error;

use crate::feed::{parse_feed, FeedFetcher, FetchError, NormalizedFeed, ParseError, ParsedFeed};
use crate::filter::EntryFilter;

/// Failures of a feed request, classified for the HTTP layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source could not be retrieved
    #[error("Failed to fetch feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    /// The source body is not a readable feed
    #[error("Failed to parse feed {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
    /// The source is a feed, but not Atom
    #[error("Unsupported {dialect} feed {url}")]
    Unsupported { url: String, dialect: String },
    /// Anything else (catalog, serialization)
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

/// A fetched, parsed and filtered source feed.
#[derive(Debug, Clone)]
pub struct FilteredFeed {
    pub feed: NormalizedFeed,
    /// Whitelisted upstream headers to pass through
    pub headers: Vec<(String, String)>,
    /// Entry count before filtering
    pub source_entries: usize,
}

/// Runs the shared front half of both routes.
pub async fn fetch_filtered(
    fetcher: &FeedFetcher,
    filter: &EntryFilter,
    url: &str,
) -> Result<FilteredFeed, PipelineError> {
    let raw = fetcher.fetch(url).await.map_err(|source| {
        tracing::warn!(url = %url, error = %source, "Failed to fetch source feed");
        PipelineError::Fetch {
            url: url.to_string(),
            source,
        }
    })?;

    let mut feed = match parse_feed(&raw.body) {
        Ok(ParsedFeed::Supported(feed)) => feed,
        Ok(ParsedFeed::Unsupported { dialect }) => {
            tracing::warn!(url = %url, dialect = %dialect, "Unsupported feed dialect");
            return Err(PipelineError::Unsupported {
                url: url.to_string(),
                dialect,
            });
        }
        Err(source) => {
            tracing::warn!(url = %url, error = %source, "Failed to parse source feed");
            return Err(PipelineError::Parse {
                url: url.to_string(),
                source,
            });
        }
    };

    let source_entries = feed.entries.len();
    let entries = std::mem::take(&mut feed.entries);
    feed.entries = filter.apply(url, entries).await;

    Ok(FilteredFeed {
        feed,
        headers: raw.headers,
        source_entries,
    })
}
