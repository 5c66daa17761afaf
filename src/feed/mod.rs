//! Source feed handling: retrieval, parsing and Atom re-serialization.
//!
//! - [`fetcher`] - single-shot HTTP retrieval with timeout and size cap
//! - [`parser`] - Atom reader producing the normalized model; other dialects are classified only
//! - [`atom`] - Atom writer used by the `/rss` route
//! - [`model`] - the normalized feed model shared by the pipeline

mod atom;
mod fetcher;
pub mod model;
mod parser;

pub use atom::write_atom;
pub use fetcher::{FeedFetcher, FetchError, RawResponse, PASSTHROUGH_HEADERS};
pub use model::{
    parse_timestamp, Category, Extension, Generator, Link, NormalizedEntry, NormalizedFeed,
    ParsedFeed, Person, Text,
};
pub use parser::{parse_feed, ParseError};
