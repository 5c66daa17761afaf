//! Filtering proxy for Atom video feeds, with a podcast view backed by a
//! local catalog and downloaded audio.

pub mod config;
pub mod feed;
pub mod filter;
pub mod media;
pub mod pipeline;
pub mod podcast;
pub mod rss;
pub mod server;
pub mod storage;
pub mod util;
