//! Navigation menu derived from settings.

use std::collections::HashMap;

use backplane_core::{Error, StoreDb};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub label: &'static str,
    pub route: &'static str,
}

impl NavEntry {
    const fn new(label: &'static str, route: &'static str) -> Self {
        Self { label, route }
    }
}

/// Menu-relevant settings, read from the `{_id, value}` documents of the
/// settings collection. A missing key reads as unset.
#[derive(Debug, Clone, PartialEq, Default)]
struct MenuSettings {
    hide_trending: bool,
    hide_popular: bool,
    hide_playlists: bool,
    backend_fallback: bool,
    backend_preference: String,
}

impl MenuSettings {
    fn from_documents(settings: &[Value]) -> Self {
        let values: HashMap<&str, &Value> = settings
            .iter()
            .filter_map(|doc| Some((doc.get("_id")?.as_str()?, doc.get("value")?)))
            .collect();
        let flag = |key: &str| values.get(key).and_then(|v| v.as_bool()).unwrap_or(false);

        Self {
            hide_trending: flag("hideTrendingVideos"),
            hide_popular: flag("hidePopularVideos"),
            hide_playlists: flag("hidePlaylists"),
            backend_fallback: flag("backendFallback"),
            backend_preference: values
                .get("backendPreference")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Build the menu from the full list of settings documents.
pub fn build_menu(settings: &[Value]) -> Vec<NavEntry> {
    let settings = MenuSettings::from_documents(settings);
    let popular_available = settings.backend_fallback || settings.backend_preference == "invidious";

    let mut entries = vec![
        NavEntry::new("Subscriptions", "/subscriptions"),
        NavEntry::new("Channels", "/subscribedchannels"),
    ];
    if !settings.hide_trending {
        entries.push(NavEntry::new("Trending", "/trending"));
    }
    if !settings.hide_popular && popular_available {
        entries.push(NavEntry::new("Most Popular", "/popular"));
    }
    if !settings.hide_playlists {
        entries.push(NavEntry::new("Playlists", "/userplaylists"));
    }
    entries.extend([
        NavEntry::new("History", "/history"),
        NavEntry::new("Profile Manager", "/settings/profile/"),
        NavEntry::new("Settings", "/settings"),
    ]);
    entries
}

pub async fn load_menu(store: &StoreDb) -> Result<Vec<NavEntry>, Error> {
    Ok(build_menu(&store.find_settings().await?))
}
