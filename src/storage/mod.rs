mod feeds;
mod items;
mod schema;
mod types;

pub use schema::Database;
pub use types::{CatalogFeed, CatalogItem, DatabaseError, ItemDraft};
