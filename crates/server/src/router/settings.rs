use backplane_core::{Error, StoreDb, SyncKind};
use serde::Deserialize;
use serde_json::Value;

use super::{Applied, payload};

/// Settings whose change alters the navigation menu.
pub const MENU_KEYS: [&str; 5] =
    ["hideTrendingVideos", "hidePopularVideos", "hidePlaylists", "backendPreference", "backendFallback"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettingUpsert {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    Find,
    Upsert(SettingUpsert),
}

impl SettingsAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        Ok(Some(match action {
            "FIND" => Self::Find,
            "UPSERT" => Self::Upsert(payload(data)?),
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_settings().await?))),
            Self::Upsert(setting) => {
                store.upsert_setting(&setting.id, setting.value).await?;
                let mut applied = Applied::synced(SyncKind::Upsert, data);
                applied.rebuild_menu = MENU_KEYS.contains(&setting.id.as_str());
                Ok(applied)
            }
        }
    }
}
