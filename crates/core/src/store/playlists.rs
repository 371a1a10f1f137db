//! User playlists and the videos they hold.

use serde_json::{Value, json};

use super::connection::StoreDb;
use super::documents::{key_of, now_millis};
use super::profiles::ensure_id;
use crate::Error;
use crate::types::Collection;

fn videos_mut(doc: &mut Value) -> Result<&mut Vec<Value>, Error> {
    if !doc.get("videos").is_some_and(Value::is_array) {
        doc["videos"] = Value::Array(Vec::new());
    }
    doc["videos"]
        .as_array_mut()
        .ok_or_else(|| Error::InvalidDocument("videos must be an array".into()))
}

fn touch(doc: &mut Value) {
    doc["lastUpdatedAt"] = json!(now_millis());
}

fn field_is(video: &Value, field: &str, expected: &str) -> bool {
    video.get(field).and_then(Value::as_str) == Some(expected)
}

impl StoreDb {
    pub async fn find_playlists(&self) -> Result<Vec<Value>, Error> {
        self.all_documents(Collection::Playlists).await
    }

    /// Store one or more new playlists, assigning ids where missing.
    pub async fn create_playlists(&self, playlists: Vec<Value>) -> Result<Vec<Value>, Error> {
        let mut docs = Vec::with_capacity(playlists.len());
        let mut created = Vec::with_capacity(playlists.len());
        for mut playlist in playlists {
            let id = ensure_id(&mut playlist)?;
            docs.push((id, playlist.clone()));
            created.push(playlist);
        }
        self.put_documents(Collection::Playlists, docs).await?;
        Ok(created)
    }

    pub async fn upsert_playlist(&self, playlist: Value) -> Result<(), Error> {
        let id = key_of(&playlist, "_id")?;
        self.put_document(Collection::Playlists, id, playlist).await
    }

    /// Append one video to a playlist.
    pub async fn upsert_video_by_playlist_id(&self, playlist_id: &str, video: Value) -> Result<(), Error> {
        self.upsert_videos_by_playlist_id(playlist_id, vec![video]).await
    }

    /// Append several videos to a playlist.
    pub async fn upsert_videos_by_playlist_id(&self, playlist_id: &str, videos: Vec<Value>) -> Result<(), Error> {
        self.modify_documents(
            Collection::Playlists,
            vec![playlist_id.to_string()],
            Box::new(move |doc| {
                videos_mut(doc)?.extend(videos.iter().cloned());
                touch(doc);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<(), Error> {
        self.remove_documents(Collection::Playlists, vec![id.to_string()]).await?;
        Ok(())
    }

    /// Remove a video from a playlist.
    ///
    /// With a `playlist_item_id` only that entry goes; otherwise every entry
    /// with the given `video_id` is removed.
    pub async fn delete_video_id_by_playlist_id(
        &self, playlist_id: &str, video_id: &str, playlist_item_id: Option<String>,
    ) -> Result<(), Error> {
        let video_id = video_id.to_string();
        self.modify_documents(
            Collection::Playlists,
            vec![playlist_id.to_string()],
            Box::new(move |doc| {
                let videos = videos_mut(doc)?;
                match &playlist_item_id {
                    Some(item_id) => videos.retain(|v| !field_is(v, "playlistItemId", item_id)),
                    None => videos.retain(|v| !field_is(v, "videoId", &video_id)),
                }
                touch(doc);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Remove several entries from a playlist by `playlistItemId`.
    pub async fn delete_video_ids_by_playlist_id(
        &self, playlist_id: &str, playlist_item_ids: Vec<String>,
    ) -> Result<(), Error> {
        self.modify_documents(
            Collection::Playlists,
            vec![playlist_id.to_string()],
            Box::new(move |doc| {
                videos_mut(doc)?.retain(|v| {
                    !v.get("playlistItemId")
                        .and_then(Value::as_str)
                        .is_some_and(|id| playlist_item_ids.iter().any(|wanted| wanted == id))
                });
                touch(doc);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_all_videos_by_playlist_id(&self, playlist_id: &str) -> Result<(), Error> {
        self.modify_documents(
            Collection::Playlists,
            vec![playlist_id.to_string()],
            Box::new(|doc| {
                doc["videos"] = Value::Array(Vec::new());
                touch(doc);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_playlists(&self, ids: Vec<String>) -> Result<(), Error> {
        self.remove_documents(Collection::Playlists, ids).await?;
        Ok(())
    }

    pub async fn delete_all_playlists(&self) -> Result<(), Error> {
        self.clear_collection(Collection::Playlists).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> StoreDb {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_playlist(json!({"_id": "pl", "playlistName": "Later", "videos": []}))
            .await
            .unwrap();
        db
    }

    fn video(video_id: &str, item_id: &str) -> Value {
        json!({"videoId": video_id, "playlistItemId": item_id})
    }

    async fn videos(db: &StoreDb) -> Vec<Value> {
        db.find_playlists().await.unwrap()[0]["videos"].as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_many() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let created = db
            .create_playlists(vec![json!({"playlistName": "a"}), json!({"_id": "b", "playlistName": "b"})])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(created[0]["_id"].is_string());
        assert_eq!(db.find_playlists().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_videos_stamps_last_updated() {
        let db = seeded().await;
        db.upsert_video_by_playlist_id("pl", video("v1", "i1")).await.unwrap();
        db.upsert_videos_by_playlist_id("pl", vec![video("v2", "i2"), video("v3", "i3")])
            .await
            .unwrap();

        assert_eq!(videos(&db).await.len(), 3);
        assert!(db.find_playlists().await.unwrap()[0]["lastUpdatedAt"].is_i64());
    }

    #[tokio::test]
    async fn test_delete_video_by_item_or_video_id() {
        let db = seeded().await;
        db.upsert_videos_by_playlist_id("pl", vec![video("v1", "i1"), video("v1", "i2"), video("v2", "i3")])
            .await
            .unwrap();

        db.delete_video_id_by_playlist_id("pl", "v1", Some("i1".into())).await.unwrap();
        assert_eq!(videos(&db).await, vec![video("v1", "i2"), video("v2", "i3")]);

        db.delete_video_id_by_playlist_id("pl", "v1", None).await.unwrap();
        assert_eq!(videos(&db).await, vec![video("v2", "i3")]);
    }

    #[tokio::test]
    async fn test_delete_video_ids_and_all_videos() {
        let db = seeded().await;
        db.upsert_videos_by_playlist_id("pl", vec![video("v1", "i1"), video("v2", "i2"), video("v3", "i3")])
            .await
            .unwrap();

        db.delete_video_ids_by_playlist_id("pl", vec!["i1".into(), "i3".into()])
            .await
            .unwrap();
        assert_eq!(videos(&db).await, vec![video("v2", "i2")]);

        db.delete_all_videos_by_playlist_id("pl").await.unwrap();
        assert!(videos(&db).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_playlists() {
        let db = StoreDb::open_in_memory().await.unwrap();
        for id in ["a", "b", "c"] {
            db.upsert_playlist(json!({"_id": id})).await.unwrap();
        }
        db.delete_playlist("a").await.unwrap();
        db.delete_playlists(vec!["b".into()]).await.unwrap();
        assert_eq!(db.find_playlists().await.unwrap(), vec![json!({"_id": "c"})]);

        db.delete_all_playlists().await.unwrap();
        assert!(db.find_playlists().await.unwrap().is_empty());
    }
}
