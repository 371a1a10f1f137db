//! SQLite-backed document store for the application collections.
//!
//! Every collection lives in one `documents` table as JSON keyed by
//! `(collection, id)`, accessed asynchronously through tokio-rusqlite.
//! Collection modules add typed operations on top of the generic
//! document layer.

pub mod connection;
mod documents;
mod history;
pub mod migrations;
mod playlists;
mod profiles;
mod search_history;
mod settings;
mod subscription_cache;

pub use connection::StoreDb;
pub use subscription_cache::ChannelFeed;
