//! Generic JSON document operations shared by every collection.
//!
//! Documents live in a single table keyed by `(collection, id)`. Collection
//! modules decide which field is the key and how a document is mutated.

use serde_json::Value;
use tokio_rusqlite::params;

use super::connection::StoreDb;
use crate::Error;
use crate::types::Collection;

/// A mutation applied to one stored document inside a transaction.
pub(crate) type Mutation = Box<dyn FnMut(&mut Value) -> Result<(), Error> + Send + 'static>;

/// Read a string key out of a document, accepting numbers as well.
pub(crate) fn key_of(doc: &Value, field: &str) -> Result<String, Error> {
    match doc.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::InvalidDocument(format!("document is missing `{field}`"))),
    }
}

/// Milliseconds since the Unix epoch, the timestamp format documents carry.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl StoreDb {
    /// All documents of a collection in insertion order.
    pub(crate) async fn all_documents(&self, collection: Collection) -> Result<Vec<Value>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<Value>, Error> {
                let mut stmt = conn.prepare("SELECT doc FROM documents WHERE collection = ?1 ORDER BY rowid ASC")?;
                let rows = stmt.query_map(params![collection.as_str()], |row| row.get::<_, String>(0))?;

                let mut docs = Vec::new();
                for raw in rows {
                    docs.push(serde_json::from_str(&raw?)?);
                }
                Ok(docs)
            })
            .await
            .map_err(Error::from)
    }

    /// One document by key, if present.
    pub(crate) async fn get_document(&self, collection: Collection, id: &str) -> Result<Option<Value>, Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Value>, Error> {
                let result = conn.query_row(
                    "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection.as_str(), id],
                    |row| row.get::<_, String>(0),
                );

                match result {
                    Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace whole documents.
    ///
    /// Replacing keeps the original row position, so `all_documents` order
    /// reflects first insertion.
    pub(crate) async fn put_documents(&self, collection: Collection, docs: Vec<(String, Value)>) -> Result<(), Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (id, doc) in &docs {
                    tx.execute(
                        "INSERT INTO documents (collection, id, doc, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(collection, id) DO UPDATE SET
                            doc = excluded.doc,
                            updated_at = excluded.updated_at",
                        params![collection.as_str(), id, serde_json::to_string(doc)?, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a single document.
    pub(crate) async fn put_document(&self, collection: Collection, id: String, doc: Value) -> Result<(), Error> {
        self.put_documents(collection, vec![(id, doc)]).await
    }

    /// Apply `mutation` to each listed document that exists.
    ///
    /// Missing ids are skipped. Returns the number of documents changed.
    pub(crate) async fn modify_documents(
        &self, collection: Collection, ids: Vec<String>, mut mutation: Mutation,
    ) -> Result<u64, Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut changed = 0u64;
                for id in &ids {
                    let raw = tx.query_row(
                        "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection.as_str(), id],
                        |row| row.get::<_, String>(0),
                    );
                    let raw = match raw {
                        Ok(raw) => raw,
                        Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => continue,
                        Err(e) => return Err(e.into()),
                    };

                    let mut doc: Value = serde_json::from_str(&raw)?;
                    mutation(&mut doc)?;
                    tx.execute(
                        "UPDATE documents SET doc = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
                        params![collection.as_str(), id, serde_json::to_string(&doc)?, now],
                    )?;
                    changed += 1;
                }
                tx.commit()?;
                Ok(changed)
            })
            .await
            .map_err(Error::from)
    }

    /// Apply `mutation` to a document, creating `{"_id": id}` first when absent.
    pub(crate) async fn upsert_document_with(
        &self, collection: Collection, id: String, mut mutation: Mutation,
    ) -> Result<Value, Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Value, Error> {
                let tx = conn.transaction()?;
                let raw = tx.query_row(
                    "SELECT doc FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection.as_str(), id],
                    |row| row.get::<_, String>(0),
                );
                let mut doc: Value = match raw {
                    Ok(raw) => serde_json::from_str(&raw)?,
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => serde_json::json!({ "_id": id }),
                    Err(e) => return Err(e.into()),
                };

                mutation(&mut doc)?;
                tx.execute(
                    "INSERT INTO documents (collection, id, doc, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(collection, id) DO UPDATE SET
                        doc = excluded.doc,
                        updated_at = excluded.updated_at",
                    params![collection.as_str(), id, serde_json::to_string(&doc)?, now],
                )?;
                tx.commit()?;
                Ok(doc)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the listed documents. Returns the number removed.
    pub(crate) async fn remove_documents(&self, collection: Collection, ids: Vec<String>) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut removed = 0u64;
                for id in &ids {
                    removed += tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection.as_str(), id],
                    )? as u64;
                }
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every document of a collection.
    pub(crate) async fn clear_collection(&self, collection: Collection) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM documents WHERE collection = ?1", params![collection.as_str()])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Atomically replace the whole collection with `docs`.
    pub(crate) async fn replace_collection(
        &self, collection: Collection, docs: Vec<(String, Value)>,
    ) -> Result<(), Error> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM documents WHERE collection = ?1", params![collection.as_str()])?;
                for (id, doc) in &docs {
                    tx.execute(
                        "INSERT OR REPLACE INTO documents (collection, id, doc, updated_at) VALUES (?1, ?2, ?3, ?4)",
                        params![collection.as_str(), id, serde_json::to_string(doc)?, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_of() {
        assert_eq!(key_of(&json!({"_id": "a"}), "_id").unwrap(), "a");
        assert_eq!(key_of(&json!({"_id": 7}), "_id").unwrap(), "7");
        assert!(key_of(&json!({"_id": ""}), "_id").is_err());
        assert!(key_of(&json!({}), "_id").is_err());
    }

    #[tokio::test]
    async fn test_put_get_and_order() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_document(Collection::Profiles, "b".into(), json!({"_id": "b"})).await.unwrap();
        db.put_document(Collection::Profiles, "a".into(), json!({"_id": "a"})).await.unwrap();
        db.put_document(Collection::Profiles, "b".into(), json!({"_id": "b", "name": "again"}))
            .await
            .unwrap();

        let docs = db.all_documents(Collection::Profiles).await.unwrap();
        assert_eq!(docs, vec![json!({"_id": "b", "name": "again"}), json!({"_id": "a"})]);
        assert!(db.all_documents(Collection::Playlists).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_modify_skips_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_document(Collection::History, "v1".into(), json!({"videoId": "v1"})).await.unwrap();

        let changed = db
            .modify_documents(
                Collection::History,
                vec!["v1".into(), "missing".into()],
                Box::new(|doc| {
                    doc["watchProgress"] = json!(5);
                    Ok(())
                }),
            )
            .await
            .unwrap();

        assert_eq!(changed, 1);
        let doc = db.get_document(Collection::History, "v1").await.unwrap().unwrap();
        assert_eq!(doc["watchProgress"], 5);
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_document(Collection::Playlists, "p1".into(), json!({"_id": "p1", "n": 1})).await.unwrap();
        db.put_document(Collection::Playlists, "p2".into(), json!({"_id": "p2", "n": 1})).await.unwrap();

        let mut seen = 0;
        let result = db
            .modify_documents(
                Collection::Playlists,
                vec!["p1".into(), "p2".into()],
                Box::new(move |doc| {
                    seen += 1;
                    if seen == 2 {
                        return Err(Error::InvalidDocument("boom".into()));
                    }
                    doc["n"] = json!(2);
                    Ok(())
                }),
            )
            .await;

        assert!(result.is_err());
        let p1 = db.get_document(Collection::Playlists, "p1").await.unwrap().unwrap();
        assert_eq!(p1["n"], 1);
    }

    #[tokio::test]
    async fn test_replace_and_clear() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_document(Collection::History, "old".into(), json!({"videoId": "old"})).await.unwrap();
        db.replace_collection(Collection::History, vec![("new".into(), json!({"videoId": "new"}))])
            .await
            .unwrap();

        let docs = db.all_documents(Collection::History).await.unwrap();
        assert_eq!(docs, vec![json!({"videoId": "new"})]);

        assert_eq!(db.clear_collection(Collection::History).await.unwrap(), 1);
        assert!(db.all_documents(Collection::History).await.unwrap().is_empty());
    }
}
