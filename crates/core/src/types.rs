//! Identifiers and messages shared by the host and the network layer.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of one top-level window.
///
/// Handles are process-unique and never reused while the process lives.
/// Nothing outside the window registry should assume a handle survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u32);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WindowHandle {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(WindowHandle)
    }
}

/// One logical persisted document set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Settings,
    History,
    Profiles,
    Playlists,
    SearchHistory,
    SubscriptionCache,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Settings,
        Collection::History,
        Collection::Profiles,
        Collection::Playlists,
        Collection::SearchHistory,
        Collection::SubscriptionCache,
    ];

    /// Name used as the `collection` column in the document table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::History => "history",
            Collection::Profiles => "profiles",
            Collection::Playlists => "playlists",
            Collection::SearchHistory => "search-history",
            Collection::SubscriptionCache => "subscription-cache",
        }
    }

    /// Sync channel carrying this collection's events to other windows.
    pub fn sync_channel(&self) -> &'static str {
        match self {
            Collection::Settings => "sync-settings",
            Collection::History => "sync-history",
            Collection::Profiles => "sync-profiles",
            Collection::Playlists => "sync-playlists",
            Collection::SearchHistory => "sync-search-history",
            Collection::SubscriptionCache => "sync-subscription-cache",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a sync event. Mirrors the action that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncKind {
    Create,
    Upsert,
    Delete,
    DeleteMany,
    DeleteAll,
    Overwrite,
    UpdateWatchProgress,
    UpdatePlaylist,
    AddChannel,
    RemoveChannel,
    UpsertVideo,
    UpsertVideos,
    DeleteVideo,
    DeleteVideos,
    UpdateVideosByChannel,
    UpdateLiveStreamsByChannel,
    UpdateShortsByChannel,
    UpdateShortsWithChannelPageShortsByChannel,
    UpdateCommunityPostsByChannel,
}

/// A broadcast message mirroring a committed store mutation.
///
/// Serialized as `{"event": <kind>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub event: SyncKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl SyncEvent {
    pub fn new(event: SyncKind, data: Value) -> Self {
        Self { event, data: Some(data) }
    }

    pub fn bare(event: SyncKind) -> Self {
        Self { event, data: None }
    }
}
