//! Per-channel feed cache, keyed by channel id.

use serde_json::{Number, Value};

use super::connection::StoreDb;
use crate::Error;
use crate::types::Collection;

/// One of the feeds cached for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFeed {
    Videos,
    LiveStreams,
    Shorts,
    CommunityPosts,
}

impl ChannelFeed {
    /// Document fields holding the entries and their fetch timestamp.
    fn fields(self) -> (&'static str, &'static str) {
        match self {
            ChannelFeed::Videos => ("videos", "videosTimestamp"),
            ChannelFeed::LiveStreams => ("liveStreams", "liveStreamsTimestamp"),
            ChannelFeed::Shorts => ("shorts", "shortsTimestamp"),
            ChannelFeed::CommunityPosts => ("communityPosts", "communityPostsTimestamp"),
        }
    }
}

/// Copy fresh channel-page details onto a cached short.
fn merge_short(cached: &mut Value, fresh: &Value) {
    for field in ["title", "author"] {
        if let Some(value) = fresh.get(field) {
            cached[field] = value.clone();
        }
    }

    let fresh_views = fresh.get("viewCount").and_then(Value::as_f64);
    let cached_views = cached.get("viewCount").and_then(Value::as_f64);
    let higher = match (fresh_views, cached_views) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if higher {
        cached["viewCount"] = fresh["viewCount"].clone();
    }
}

impl StoreDb {
    pub async fn find_subscription_cache(&self) -> Result<Vec<Value>, Error> {
        self.all_documents(Collection::SubscriptionCache).await
    }

    /// Replace one feed of a channel, creating the channel entry if needed.
    pub async fn update_channel_feed(
        &self, feed: ChannelFeed, channel_id: &str, entries: Vec<Value>, timestamp: Number,
    ) -> Result<(), Error> {
        let (list_field, timestamp_field) = feed.fields();
        self.upsert_document_with(
            Collection::SubscriptionCache,
            channel_id.to_string(),
            Box::new(move |doc| {
                doc[list_field] = Value::Array(entries.clone());
                doc[timestamp_field] = Value::Number(timestamp.clone());
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    /// Refresh already cached shorts with details from a channel page.
    ///
    /// Shorts not present in the cache are ignored, as are channels without cached shorts.
    pub async fn update_shorts_with_channel_page_shorts(&self, channel_id: &str, entries: Vec<Value>) -> Result<(), Error> {
        self.modify_documents(
            Collection::SubscriptionCache,
            vec![channel_id.to_string()],
            Box::new(move |doc| {
                let Some(shorts) = doc.get_mut("shorts").and_then(Value::as_array_mut) else {
                    return Ok(());
                };
                for cached in shorts.iter_mut() {
                    let Some(video_id) = cached.get("videoId").and_then(Value::as_str) else {
                        continue;
                    };
                    let fresh = entries
                        .iter()
                        .find(|entry| entry.get("videoId").and_then(Value::as_str) == Some(video_id));
                    if let Some(fresh) = fresh {
                        merge_short(cached, fresh);
                    }
                }
                Ok(())
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_subscription_cache_channels(&self, channel_ids: Vec<String>) -> Result<(), Error> {
        self.remove_documents(Collection::SubscriptionCache, channel_ids).await?;
        Ok(())
    }

    pub async fn delete_all_subscription_cache(&self) -> Result<(), Error> {
        self.clear_collection(Collection::SubscriptionCache).await?;
        Ok(())
    }
}
