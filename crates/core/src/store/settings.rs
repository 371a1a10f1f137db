//! Settings collection: `{_id, value}` pairs.

use serde_json::{Value, json};

use super::connection::StoreDb;
use crate::Error;
use crate::types::Collection;

/// Window geometry is persisted alongside settings but never handed out.
const BOUNDS_ID: &str = "bounds";

impl StoreDb {
    /// Every setting document except the internal window bounds.
    pub async fn find_settings(&self) -> Result<Vec<Value>, Error> {
        let docs = self.all_documents(Collection::Settings).await?;
        Ok(docs.into_iter().filter(|doc| doc.get("_id").and_then(Value::as_str) != Some(BOUNDS_ID)).collect())
    }

    /// Insert or replace one setting.
    pub async fn upsert_setting(&self, id: &str, value: Value) -> Result<(), Error> {
        if id.is_empty() {
            return Err(Error::InvalidDocument("setting id cannot be empty".into()));
        }
        self.put_document(Collection::Settings, id.to_string(), json!({ "_id": id, "value": value }))
            .await
    }

    /// The stored value of one setting.
    pub async fn find_setting_value(&self, id: &str) -> Result<Option<Value>, Error> {
        Ok(self
            .get_document(Collection::Settings, id)
            .await?
            .and_then(|mut doc| doc.get_mut("value").map(Value::take)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_find_setting() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_setting("hidePlaylists", json!(true)).await.unwrap();
        db.upsert_setting("hidePlaylists", json!(false)).await.unwrap();

        assert_eq!(db.find_setting_value("hidePlaylists").await.unwrap(), Some(json!(false)));
        assert_eq!(db.find_setting_value("missing").await.unwrap(), None);
        assert_eq!(db.find_settings().await.unwrap(), vec![json!({"_id": "hidePlaylists", "value": false})]);
    }

    #[tokio::test]
    async fn test_find_settings_hides_bounds() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_setting(BOUNDS_ID, json!({"x": 0, "y": 0})).await.unwrap();
        db.upsert_setting("theme", json!("dark")).await.unwrap();

        let settings = db.find_settings().await.unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0]["_id"], "theme");
    }

    #[tokio::test]
    async fn test_empty_setting_id_rejected() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(matches!(db.upsert_setting("", json!(1)).await, Err(Error::InvalidDocument(_))));
    }
}
