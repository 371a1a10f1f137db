use backplane_core::{Error, StoreDb, SyncKind};
use serde::Deserialize;
use serde_json::{Number, Value};

use super::{Applied, payload};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub video_id: String,
    pub watch_progress: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastViewedPlaylist {
    pub video_id: String,
    #[serde(default)]
    pub last_viewed_playlist_id: Option<String>,
    #[serde(default)]
    pub last_viewed_playlist_type: Option<String>,
    #[serde(default)]
    pub last_viewed_playlist_item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    Find,
    Upsert(Value),
    Overwrite(Vec<Value>),
    UpdateWatchProgress(WatchProgress),
    UpdatePlaylist(LastViewedPlaylist),
    Delete(String),
    DeleteAll,
}

impl HistoryAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        Ok(Some(match action {
            "FIND" => Self::Find,
            "UPSERT" => Self::Upsert(data.clone()),
            "OVERWRITE" => Self::Overwrite(payload(data)?),
            "UPDATE_WATCH_PROGRESS" => Self::UpdateWatchProgress(payload(data)?),
            "UPDATE_PLAYLIST" => Self::UpdatePlaylist(payload(data)?),
            "DELETE" => Self::Delete(payload(data)?),
            "DELETE_ALL" => Self::DeleteAll,
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_history().await?))),
            Self::Upsert(record) => {
                store.upsert_history(record).await?;
                Ok(Applied::synced(SyncKind::Upsert, data))
            }
            Self::Overwrite(records) => {
                store.overwrite_history(records).await?;
                Ok(Applied::synced(SyncKind::Overwrite, data))
            }
            Self::UpdateWatchProgress(p) => {
                store.update_watch_progress(&p.video_id, p.watch_progress).await?;
                Ok(Applied::synced(SyncKind::UpdateWatchProgress, data))
            }
            Self::UpdatePlaylist(p) => {
                store
                    .update_last_viewed_playlist(
                        &p.video_id,
                        p.last_viewed_playlist_id,
                        p.last_viewed_playlist_type,
                        p.last_viewed_playlist_item_id,
                    )
                    .await?;
                Ok(Applied::synced(SyncKind::UpdatePlaylist, data))
            }
            Self::Delete(video_id) => {
                store.delete_history(&video_id).await?;
                Ok(Applied::synced(SyncKind::Delete, data))
            }
            Self::DeleteAll => {
                store.delete_all_history().await?;
                Ok(Applied::bare(SyncKind::DeleteAll))
            }
        }
    }
}
