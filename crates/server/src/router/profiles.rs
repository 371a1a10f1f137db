use backplane_core::{Error, StoreDb, SyncKind};
use serde::Deserialize;
use serde_json::Value;

use super::{Applied, payload};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChannel {
    pub channel: Value,
    pub profile_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveChannel {
    pub channel_id: String,
    pub profile_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileAction {
    Find,
    Create(Value),
    Upsert(Value),
    AddChannel(AddChannel),
    RemoveChannel(RemoveChannel),
    Delete(String),
}

impl ProfileAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        Ok(Some(match action {
            "FIND" => Self::Find,
            "CREATE" => Self::Create(data.clone()),
            "UPSERT" => Self::Upsert(data.clone()),
            "ADD_CHANNEL" => Self::AddChannel(payload(data)?),
            "REMOVE_CHANNEL" => Self::RemoveChannel(payload(data)?),
            "DELETE" => Self::Delete(payload(data)?),
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_profiles().await?))),
            Self::Create(profile) => {
                // Other windows need the assigned id, so they get the stored profile.
                let created = store.create_profile(profile).await?;
                let mut applied = Applied::synced(SyncKind::Create, created.clone());
                applied.reply = created;
                Ok(applied)
            }
            Self::Upsert(profile) => {
                store.upsert_profile(profile).await?;
                Ok(Applied::synced(SyncKind::Upsert, data))
            }
            Self::AddChannel(add) => {
                store.add_channel_to_profiles(add.channel, add.profile_ids).await?;
                Ok(Applied::synced(SyncKind::AddChannel, data))
            }
            Self::RemoveChannel(remove) => {
                store
                    .remove_channel_from_profiles(&remove.channel_id, remove.profile_ids)
                    .await?;
                Ok(Applied::synced(SyncKind::RemoveChannel, data))
            }
            Self::Delete(id) => {
                store.delete_profile(&id).await?;
                Ok(Applied::synced(SyncKind::Delete, data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use backplane_core::{Collection, StoreDb, SyncKind};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_returns_and_syncs_stored_profile() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let applied = dispatch(&store, Collection::Profiles, "CREATE", json!({"name": "Music"}))
            .await
            .unwrap();

        assert!(applied.reply["_id"].is_string());
        let sync = applied.sync.unwrap();
        assert_eq!(sync.event, SyncKind::Create);
        assert_eq!(sync.data, Some(applied.reply.clone()));
        assert_eq!(store.find_profiles().await.unwrap(), vec![applied.reply]);
    }

    #[tokio::test]
    async fn test_add_and_remove_channel() {
        let store = StoreDb::open_in_memory().await.unwrap();
        store.upsert_profile(json!({"_id": "p1", "subscriptions": []})).await.unwrap();

        let add = json!({"channel": {"id": "UC1", "name": "One"}, "profileIds": ["p1"]});
        let applied = dispatch(&store, Collection::Profiles, "ADD_CHANNEL", add.clone()).await.unwrap();
        assert_eq!(applied.sync.unwrap().data, Some(add));

        let remove = json!({"channelId": "UC1", "profileIds": ["p1"]});
        let applied = dispatch(&store, Collection::Profiles, "REMOVE_CHANNEL", remove).await.unwrap();
        assert_eq!(applied.sync.unwrap().event, SyncKind::RemoveChannel);
        assert_eq!(store.find_profiles().await.unwrap()[0]["subscriptions"], json!([]));
    }
}
