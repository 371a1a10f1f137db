use backplane_core::{Error, StoreDb, SyncKind};
use serde_json::Value;

use super::{Applied, payload};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHistoryAction {
    Find,
    Upsert(Value),
    Delete(String),
    DeleteAll,
}

impl SearchHistoryAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        Ok(Some(match action {
            "FIND" => Self::Find,
            "UPSERT" => Self::Upsert(data.clone()),
            "DELETE" => Self::Delete(payload(data)?),
            "DELETE_ALL" => Self::DeleteAll,
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_search_history().await?))),
            Self::Upsert(entry) => {
                store.upsert_search_history(entry).await?;
                Ok(Applied::synced(SyncKind::Upsert, data))
            }
            Self::Delete(id) => {
                store.delete_search_history(&id).await?;
                Ok(Applied::synced(SyncKind::Delete, data))
            }
            Self::DeleteAll => {
                store.delete_all_search_history().await?;
                Ok(Applied::bare(SyncKind::DeleteAll))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::dispatch;
    use backplane_core::{Collection, StoreDb, SyncEvent, SyncKind};
    use serde_json::json;

    #[tokio::test]
    async fn test_search_history_actions() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let entry = json!({"_id": "rust async", "lastUpdatedAt": 1});

        let applied = dispatch(&store, Collection::SearchHistory, "UPSERT", entry.clone()).await.unwrap();
        assert_eq!(applied.sync, Some(SyncEvent::new(SyncKind::Upsert, entry.clone())));

        let applied = dispatch(&store, Collection::SearchHistory, "FIND", json!(null)).await.unwrap();
        assert_eq!(applied.reply, json!([entry]));

        let applied = dispatch(&store, Collection::SearchHistory, "DELETE_ALL", json!(null)).await.unwrap();
        assert_eq!(applied.sync, Some(SyncEvent::bare(SyncKind::DeleteAll)));
    }
}
