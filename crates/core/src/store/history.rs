//! Watch history collection, keyed by `videoId`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::connection::StoreDb;
use super::documents::key_of;
use crate::Error;
use crate::types::Collection;

fn time_watched(doc: &Value) -> f64 {
    doc.get("timeWatched").and_then(Value::as_f64).unwrap_or(0.0)
}

fn keyed(records: Vec<Value>) -> Result<Vec<(String, Value)>, Error> {
    records
        .into_iter()
        .map(|record| Ok((key_of(&record, "videoId")?, record)))
        .collect()
}

impl StoreDb {
    /// All history records, most recently watched first.
    pub async fn find_history(&self) -> Result<Vec<Value>, Error> {
        let mut docs = self.all_documents(Collection::History).await?;
        docs.sort_by(|a, b| time_watched(b).partial_cmp(&time_watched(a)).unwrap_or(Ordering::Equal));
        Ok(docs)
    }

    /// Insert or replace the record for its `videoId`.
    pub async fn upsert_history(&self, record: Value) -> Result<(), Error> {
        let id = key_of(&record, "videoId")?;
        self.put_document(Collection::History, id, record).await
    }

    /// Replace the whole history with `records`.
    pub async fn overwrite_history(&self, records: Vec<Value>) -> Result<(), Error> {
        let docs = keyed(records)?;
        self.replace_collection(Collection::History, docs).await
    }

    /// Set the playback position of one video. Unknown videos are left alone.
    pub async fn update_watch_progress(&self, video_id: &str, watch_progress: Number) -> Result<(), Error> {
        self.modify_documents(
            Collection::History,
            vec![video_id.to_string()],
            Box::new(move |doc| {
                doc["watchProgress"] = Value::Number(watch_progress.clone());
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Remember which playlist a video was last watched from.
    pub async fn update_last_viewed_playlist(
        &self, video_id: &str, playlist_id: Option<String>, playlist_type: Option<String>,
        playlist_item_id: Option<String>,
    ) -> Result<(), Error> {
        self.modify_documents(
            Collection::History,
            vec![video_id.to_string()],
            Box::new(move |doc| {
                doc["lastViewedPlaylistId"] = playlist_id.clone().map_or(Value::Null, Value::String);
                doc["lastViewedPlaylistType"] = playlist_type.clone().map_or(Value::Null, Value::String);
                doc["lastViewedPlaylistItemId"] = playlist_item_id.clone().map_or(Value::Null, Value::String);
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_history(&self, video_id: &str) -> Result<(), Error> {
        self.remove_documents(Collection::History, vec![video_id.to_string()]).await?;
        Ok(())
    }

    pub async fn delete_all_history(&self) -> Result<(), Error> {
        self.clear_collection(Collection::History).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_history_sorted_newest_first() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_history(json!({"videoId": "old", "timeWatched": 100})).await.unwrap();
        db.upsert_history(json!({"videoId": "new", "timeWatched": 300})).await.unwrap();
        db.upsert_history(json!({"videoId": "mid", "timeWatched": 200})).await.unwrap();

        let ids: Vec<_> = db
            .find_history()
            .await
            .unwrap()
            .iter()
            .map(|d| d["videoId"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_upsert_requires_video_id() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(matches!(db.upsert_history(json!({"title": "x"})).await, Err(Error::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_update_watch_progress_keeps_number_shape() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_history(json!({"videoId": "abc", "watchProgress": 0})).await.unwrap();
        db.update_watch_progress("abc", Number::from(42)).await.unwrap();
        db.update_watch_progress("unknown", Number::from(1)).await.unwrap();

        let docs = db.find_history().await.unwrap();
        assert_eq!(docs, vec![json!({"videoId": "abc", "watchProgress": 42})]);
    }

    #[tokio::test]
    async fn test_update_last_viewed_playlist() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_history(json!({"videoId": "abc"})).await.unwrap();
        db.update_last_viewed_playlist("abc", Some("pl".into()), Some("user".into()), None)
            .await
            .unwrap();

        let doc = &db.find_history().await.unwrap()[0];
        assert_eq!(doc["lastViewedPlaylistId"], "pl");
        assert_eq!(doc["lastViewedPlaylistType"], "user");
        assert_eq!(doc["lastViewedPlaylistItemId"], Value::Null);
    }

    #[tokio::test]
    async fn test_overwrite_and_delete() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_history(json!({"videoId": "gone"})).await.unwrap();
        db.overwrite_history(vec![json!({"videoId": "a"}), json!({"videoId": "b"})])
            .await
            .unwrap();
        assert_eq!(db.find_history().await.unwrap().len(), 2);

        db.delete_history("a").await.unwrap();
        assert_eq!(db.find_history().await.unwrap(), vec![json!({"videoId": "b"})]);

        db.delete_all_history().await.unwrap();
        assert!(db.find_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_rejects_bad_record_without_touching_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_history(json!({"videoId": "kept"})).await.unwrap();
        assert!(db.overwrite_history(vec![json!({"nope": 1})]).await.is_err());
        assert_eq!(db.find_history().await.unwrap().len(), 1);
    }
}
