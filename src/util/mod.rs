//! Utility functions shared by the feed pipeline.
//!
//! - **Identifiers**: extraction of video/channel identifiers from entry ids and URLs
//! - **XML output**: a small in-memory writer used by both output dialects

mod xml;
mod youtube;

pub(crate) use xml::XmlDocument;
pub use xml::SerializeError;
pub use youtube::{
    channel_id, content_id, video_id, video_id_from_entry_id, watch_url, CHANNEL_URL_BASE,
    WATCH_URL_BASE,
};
