//! Core types and shared functionality for backplane.
//!
//! This crate provides:
//! - The SQLite document store behind every persisted collection
//! - Unified error types
//! - Configuration structures
//! - The on-disk player cache

pub mod config;
pub mod error;
pub mod player_cache;
pub mod store;
pub mod types;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use player_cache::PlayerCache;
pub use store::{ChannelFeed, StoreDb};
pub use types::{Collection, SyncEvent, SyncKind, WindowHandle};
