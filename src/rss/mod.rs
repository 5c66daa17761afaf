//! RSS 2.0 output: the channel model, Atom conversion, and serialization.

mod convert;
mod model;
mod writer;

pub use convert::{convert_entry, convert_feed};
pub use model::{Enclosure, RssCategory, RssChannel, RssImage, RssItem};
pub use writer::{write_rss, CONTENT_NAMESPACE, ITUNES_NAMESPACE};
