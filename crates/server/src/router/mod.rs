//! Collection action router.
//!
//! Each collection has a closed set of actions, parsed from the wire form
//! `{action, data}` into a typed variant. Applying an action runs it against
//! the store and yields the reply for the issuing window plus the sync event
//! other windows should see. The event carries the original `data`
//! untouched. A failed store call yields no event.

use backplane_core::{Collection, Error, StoreDb, SyncEvent, SyncKind};
use serde::de::DeserializeOwned;
use serde_json::Value;

mod history;
mod playlists;
mod profiles;
mod search_history;
mod settings;
mod subscription_cache;

pub use history::HistoryAction;
pub use playlists::PlaylistAction;
pub use profiles::ProfileAction;
pub use search_history::SearchHistoryAction;
pub use settings::SettingsAction;
pub use subscription_cache::SubscriptionCacheAction;

/// Result of a successfully applied action.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Returned to the issuing window.
    pub reply: Value,
    /// Broadcast to every other window.
    pub sync: Option<SyncEvent>,
    /// The navigation menu depends on what was written.
    pub rebuild_menu: bool,
}

impl Applied {
    fn reply(reply: Value) -> Self {
        Self { reply, sync: None, rebuild_menu: false }
    }

    fn synced(kind: SyncKind, data: Value) -> Self {
        Self { reply: Value::Null, sync: Some(SyncEvent::new(kind, data)), rebuild_menu: false }
    }

    fn bare(kind: SyncKind) -> Self {
        Self { reply: Value::Null, sync: Some(SyncEvent::bare(kind)), rebuild_menu: false }
    }

    fn silent() -> Self {
        Self::reply(Value::Null)
    }
}

/// Decode an action payload into its typed form.
fn payload<T: DeserializeOwned>(data: &Value) -> Result<T, Error> {
    serde_json::from_value(data.clone()).map_err(|e| Error::InvalidDocument(e.to_string()))
}

/// A parsed action against one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Settings(SettingsAction),
    History(HistoryAction),
    Profiles(ProfileAction),
    Playlists(PlaylistAction),
    SearchHistory(SearchHistoryAction),
    SubscriptionCache(SubscriptionCacheAction),
}

impl Action {
    /// Parse the wire form of an action.
    ///
    /// An unknown action name fails with `InvalidAction` naming the
    /// collection; a payload of the wrong shape fails with `InvalidDocument`.
    pub fn parse(collection: Collection, action: &str, data: &Value) -> Result<Self, Error> {
        let parsed = match collection {
            Collection::Settings => SettingsAction::parse(action, data)?.map(Action::Settings),
            Collection::History => HistoryAction::parse(action, data)?.map(Action::History),
            Collection::Profiles => ProfileAction::parse(action, data)?.map(Action::Profiles),
            Collection::Playlists => PlaylistAction::parse(action, data)?.map(Action::Playlists),
            Collection::SearchHistory => SearchHistoryAction::parse(action, data)?.map(Action::SearchHistory),
            Collection::SubscriptionCache => {
                SubscriptionCacheAction::parse(action, data)?.map(Action::SubscriptionCache)
            }
        };
        parsed.ok_or(Error::InvalidAction(collection))
    }

    /// Run the action against the store. `data` is the raw payload the
    /// action was parsed from.
    pub async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Action::Settings(action) => action.apply(store, data).await,
            Action::History(action) => action.apply(store, data).await,
            Action::Profiles(action) => action.apply(store, data).await,
            Action::Playlists(action) => action.apply(store, data).await,
            Action::SearchHistory(action) => action.apply(store, data).await,
            Action::SubscriptionCache(action) => action.apply(store, data).await,
        }
    }
}

/// Parse and apply one action, flattening any failure other than an
/// unknown action into a store error message.
pub async fn dispatch(store: &StoreDb, collection: Collection, action: &str, data: Value) -> Result<Applied, Error> {
    let parsed = Action::parse(collection, action, &data).map_err(Error::into_store_message)?;
    parsed.apply(store, data).await.map_err(Error::into_store_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> StoreDb {
        StoreDb::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_action_names_collection() {
        let store = store().await;
        for collection in Collection::ALL {
            let err = dispatch(&store, collection, "EXPLODE", Value::Null).await.unwrap_err();
            assert!(matches!(err, Error::InvalidAction(c) if c == collection));
            assert!(err.to_string().contains(collection.as_str()));
        }
    }

    #[tokio::test]
    async fn test_bad_payload_is_store_error() {
        let store = store().await;
        let err = dispatch(&store, Collection::History, "UPDATE_WATCH_PROGRESS", json!({"videoId": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_store_failure_emits_nothing() {
        let store = store().await;
        store.clone().close().await.unwrap();

        let err = dispatch(&store, Collection::History, "UPSERT", json!({"videoId": "abc"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_parse_typed_payload() {
        let action = Action::parse(Collection::History, "DELETE", &json!("abc")).unwrap();
        assert_eq!(action, Action::History(HistoryAction::Delete("abc".into())));
    }
}
