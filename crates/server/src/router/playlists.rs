use backplane_core::{Error, StoreDb, SyncKind};
use serde::Deserialize;
use serde_json::Value;

use super::{Applied, payload};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertVideo {
    #[serde(rename = "_id")]
    pub playlist_id: String,
    pub video_data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpsertVideos {
    #[serde(rename = "_id")]
    pub playlist_id: String,
    pub videos: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVideo {
    #[serde(rename = "_id")]
    pub playlist_id: String,
    pub video_id: String,
    #[serde(default)]
    pub playlist_item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVideos {
    #[serde(rename = "_id")]
    pub playlist_id: String,
    pub playlist_item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistAction {
    Find,
    Create(Vec<Value>),
    Upsert(Value),
    UpsertVideo(UpsertVideo),
    UpsertVideos(UpsertVideos),
    Delete(String),
    DeleteVideoId(DeleteVideo),
    DeleteVideoIds(DeleteVideos),
    DeleteAllVideos(String),
    DeleteMany(Vec<String>),
    DeleteAll,
}

impl PlaylistAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        Ok(Some(match action {
            "FIND" => Self::Find,
            "CREATE" => Self::Create(match data {
                Value::Array(playlists) => playlists.clone(),
                playlist => vec![playlist.clone()],
            }),
            "UPSERT" => Self::Upsert(data.clone()),
            "UPSERT_VIDEO" => Self::UpsertVideo(payload(data)?),
            "UPSERT_VIDEOS" => Self::UpsertVideos(payload(data)?),
            "DELETE" => Self::Delete(payload(data)?),
            "DELETE_VIDEO_ID" => Self::DeleteVideoId(payload(data)?),
            "DELETE_VIDEO_IDS" => Self::DeleteVideoIds(payload(data)?),
            "DELETE_ALL_VIDEOS" => Self::DeleteAllVideos(payload(data)?),
            "DELETE_MANY" => Self::DeleteMany(payload(data)?),
            "DELETE_ALL" => Self::DeleteAll,
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_playlists().await?))),
            Self::Create(playlists) => {
                // Reply and broadcast carry the assigned ids.
                let created = store.create_playlists(playlists).await?;
                let created = match data {
                    Value::Array(_) => Value::Array(created),
                    _ => created.into_iter().next().unwrap_or(Value::Null),
                };
                let mut applied = Applied::synced(SyncKind::Create, created.clone());
                applied.reply = created;
                Ok(applied)
            }
            Self::Upsert(playlist) => {
                store.upsert_playlist(playlist).await?;
                Ok(Applied::synced(SyncKind::Upsert, data))
            }
            Self::UpsertVideo(p) => {
                store.upsert_video_by_playlist_id(&p.playlist_id, p.video_data).await?;
                Ok(Applied::synced(SyncKind::UpsertVideo, data))
            }
            Self::UpsertVideos(p) => {
                store.upsert_videos_by_playlist_id(&p.playlist_id, p.videos).await?;
                Ok(Applied::synced(SyncKind::UpsertVideos, data))
            }
            Self::Delete(id) => {
                store.delete_playlist(&id).await?;
                Ok(Applied::synced(SyncKind::Delete, data))
            }
            Self::DeleteVideoId(p) => {
                store
                    .delete_video_id_by_playlist_id(&p.playlist_id, &p.video_id, p.playlist_item_id)
                    .await?;
                Ok(Applied::synced(SyncKind::DeleteVideo, data))
            }
            Self::DeleteVideoIds(p) => {
                store
                    .delete_video_ids_by_playlist_id(&p.playlist_id, p.playlist_item_ids)
                    .await?;
                Ok(Applied::synced(SyncKind::DeleteVideos, data))
            }
            // The three bulk deletions below are not synchronized across windows yet.
            Self::DeleteAllVideos(id) => {
                store.delete_all_videos_by_playlist_id(&id).await?;
                Ok(Applied::silent())
            }
            Self::DeleteMany(ids) => {
                store.delete_playlists(ids).await?;
                Ok(Applied::silent())
            }
            Self::DeleteAll => {
                store.delete_all_playlists().await?;
                Ok(Applied::silent())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use backplane_core::{Collection, StoreDb, SyncEvent, SyncKind};
    use serde_json::json;

    async fn seeded() -> StoreDb {
        let store = StoreDb::open_in_memory().await.unwrap();
        store
            .upsert_playlist(json!({"_id": "pl", "videos": [{"videoId": "v1", "playlistItemId": "i1"}]}))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_single_or_many() {
        let store = StoreDb::open_in_memory().await.unwrap();
        dispatch(&store, Collection::Playlists, "CREATE", json!({"playlistName": "a"})).await.unwrap();
        dispatch(&store, Collection::Playlists, "CREATE", json!([{"playlistName": "b"}, {"playlistName": "c"}]))
            .await
            .unwrap();
        assert_eq!(store.find_playlists().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_returns_and_syncs_assigned_id() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let applied = dispatch(&store, Collection::Playlists, "CREATE", json!({"playlistName": "a"}))
            .await
            .unwrap();

        let id = applied.reply["_id"].as_str().unwrap().to_string();
        assert_eq!(applied.reply["playlistName"], "a");
        assert_eq!(applied.sync, Some(SyncEvent::new(SyncKind::Create, applied.reply.clone())));
        assert_eq!(store.find_playlists().await.unwrap()[0]["_id"], id.as_str());

        let applied = dispatch(&store, Collection::Playlists, "CREATE", json!([{"playlistName": "b"}]))
            .await
            .unwrap();
        let synced = applied.sync.unwrap().data.unwrap();
        assert!(synced[0]["_id"].is_string());
        assert_eq!(synced, applied.reply);
    }

    #[tokio::test]
    async fn test_video_deletions_use_renamed_sync_kinds() {
        let store = seeded().await;

        let data = json!({"_id": "pl", "videoId": "v1", "playlistItemId": "i1"});
        let applied = dispatch(&store, Collection::Playlists, "DELETE_VIDEO_ID", data.clone()).await.unwrap();
        assert_eq!(applied.sync, Some(SyncEvent::new(SyncKind::DeleteVideo, data)));

        let data = json!({"_id": "pl", "playlistItemIds": ["i9"]});
        let applied = dispatch(&store, Collection::Playlists, "DELETE_VIDEO_IDS", data.clone()).await.unwrap();
        assert_eq!(applied.sync, Some(SyncEvent::new(SyncKind::DeleteVideos, data)));
    }

    #[tokio::test]
    async fn test_upsert_video() {
        let store = seeded().await;
        let data = json!({"_id": "pl", "videoData": {"videoId": "v2", "playlistItemId": "i2"}});
        let applied = dispatch(&store, Collection::Playlists, "UPSERT_VIDEO", data).await.unwrap();
        assert_eq!(applied.sync.unwrap().event, SyncKind::UpsertVideo);
        assert_eq!(store.find_playlists().await.unwrap()[0]["videos"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_deletions_do_not_sync() {
        let store = seeded().await;
        for (action, data) in [
            ("DELETE_ALL_VIDEOS", json!("pl")),
            ("DELETE_MANY", json!(["pl"])),
            ("DELETE_ALL", json!(null)),
        ] {
            let applied = dispatch(&store, Collection::Playlists, action, data).await.unwrap();
            assert_eq!(applied.sync, None, "{action} must not broadcast");
        }
        assert!(store.find_playlists().await.unwrap().is_empty());
    }
}
