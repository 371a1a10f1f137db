//! Search history collection.

use std::cmp::Ordering;

use serde_json::Value;

use super::connection::StoreDb;
use super::documents::key_of;
use crate::Error;
use crate::types::Collection;

fn last_updated(doc: &Value) -> f64 {
    doc.get("lastUpdatedAt").and_then(Value::as_f64).unwrap_or(0.0)
}

impl StoreDb {
    /// All search history entries, most recent first.
    pub async fn find_search_history(&self) -> Result<Vec<Value>, Error> {
        let mut docs = self.all_documents(Collection::SearchHistory).await?;
        docs.sort_by(|a, b| last_updated(b).partial_cmp(&last_updated(a)).unwrap_or(Ordering::Equal));
        Ok(docs)
    }

    pub async fn upsert_search_history(&self, entry: Value) -> Result<(), Error> {
        let id = key_of(&entry, "_id")?;
        self.put_document(Collection::SearchHistory, id, entry).await
    }

    pub async fn delete_search_history(&self, id: &str) -> Result<(), Error> {
        self.remove_documents(Collection::SearchHistory, vec![id.to_string()]).await?;
        Ok(())
    }

    pub async fn delete_all_search_history(&self) -> Result<(), Error> {
        self.clear_collection(Collection::SearchHistory).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_search_history_lifecycle() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.upsert_search_history(json!({"_id": "rust", "lastUpdatedAt": 1})).await.unwrap();
        db.upsert_search_history(json!({"_id": "tokio", "lastUpdatedAt": 5})).await.unwrap();

        let ids: Vec<_> = db
            .find_search_history()
            .await
            .unwrap()
            .iter()
            .map(|d| d["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["tokio", "rust"]);

        db.delete_search_history("tokio").await.unwrap();
        assert_eq!(db.find_search_history().await.unwrap().len(), 1);

        db.delete_all_search_history().await.unwrap();
        assert!(db.find_search_history().await.unwrap().is_empty());
    }
}
