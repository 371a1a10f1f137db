//! Profiles collection: named groups of channel subscriptions.

use serde_json::Value;

use super::connection::StoreDb;
use super::documents::key_of;
use crate::Error;
use crate::types::Collection;

/// Assign a fresh `_id` to a document that has none.
pub(crate) fn ensure_id(doc: &mut Value) -> Result<String, Error> {
    if !doc.is_object() {
        return Err(Error::InvalidDocument("document must be an object".into()));
    }
    match key_of(doc, "_id") {
        Ok(id) => Ok(id),
        Err(_) => {
            let id = uuid::Uuid::new_v4().simple().to_string();
            doc["_id"] = Value::String(id.clone());
            Ok(id)
        }
    }
}

fn subscriptions_mut(doc: &mut Value) -> Result<&mut Vec<Value>, Error> {
    if !doc.get("subscriptions").is_some_and(Value::is_array) {
        doc["subscriptions"] = Value::Array(Vec::new());
    }
    doc["subscriptions"]
        .as_array_mut()
        .ok_or_else(|| Error::InvalidDocument("subscriptions must be an array".into()))
}

impl StoreDb {
    pub async fn find_profiles(&self) -> Result<Vec<Value>, Error> {
        self.all_documents(Collection::Profiles).await
    }

    /// Store a new profile and return it with its assigned `_id`.
    pub async fn create_profile(&self, mut profile: Value) -> Result<Value, Error> {
        let id = ensure_id(&mut profile)?;
        self.put_document(Collection::Profiles, id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn upsert_profile(&self, profile: Value) -> Result<(), Error> {
        let id = key_of(&profile, "_id")?;
        self.put_document(Collection::Profiles, id, profile).await
    }

    /// Subscribe each listed profile to `channel`, skipping profiles that
    /// already hold a channel with the same `id`.
    pub async fn add_channel_to_profiles(&self, channel: Value, profile_ids: Vec<String>) -> Result<(), Error> {
        let channel_id = key_of(&channel, "id")?;
        self.modify_documents(
            Collection::Profiles,
            profile_ids,
            Box::new(move |doc| {
                let subscriptions = subscriptions_mut(doc)?;
                let present = subscriptions
                    .iter()
                    .any(|sub| key_of(sub, "id").is_ok_and(|id| id == channel_id));
                if !present {
                    subscriptions.push(channel.clone());
                }
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_channel_from_profiles(&self, channel_id: &str, profile_ids: Vec<String>) -> Result<(), Error> {
        let channel_id = channel_id.to_string();
        self.modify_documents(
            Collection::Profiles,
            profile_ids,
            Box::new(move |doc| {
                subscriptions_mut(doc)?.retain(|sub| !key_of(sub, "id").is_ok_and(|id| id == channel_id));
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), Error> {
        self.remove_documents(Collection::Profiles, vec![id.to_string()]).await?;
        Ok(())
    }
}
