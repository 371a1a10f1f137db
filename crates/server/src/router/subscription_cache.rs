use backplane_core::{ChannelFeed, Error, StoreDb, SyncKind};
use serde::Deserialize;
use serde_json::{Number, Value};

use super::{Applied, payload};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedUpdate {
    pub channel_id: String,
    pub entries: Vec<Value>,
    pub timestamp: Number,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPageShorts {
    pub channel_id: String,
    pub entries: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionCacheAction {
    Find,
    UpdateFeed(ChannelFeed, FeedUpdate),
    UpdateShortsWithChannelPageShorts(ChannelPageShorts),
    DeleteMany(Vec<String>),
    DeleteAll,
}

fn feed_sync_kind(feed: ChannelFeed) -> SyncKind {
    match feed {
        ChannelFeed::Videos => SyncKind::UpdateVideosByChannel,
        ChannelFeed::LiveStreams => SyncKind::UpdateLiveStreamsByChannel,
        ChannelFeed::Shorts => SyncKind::UpdateShortsByChannel,
        ChannelFeed::CommunityPosts => SyncKind::UpdateCommunityPostsByChannel,
    }
}

impl SubscriptionCacheAction {
    pub(super) fn parse(action: &str, data: &Value) -> Result<Option<Self>, Error> {
        let feed = match action {
            "UPDATE_VIDEOS_BY_CHANNEL" => Some(ChannelFeed::Videos),
            "UPDATE_LIVE_STREAMS_BY_CHANNEL" => Some(ChannelFeed::LiveStreams),
            "UPDATE_SHORTS_BY_CHANNEL" => Some(ChannelFeed::Shorts),
            "UPDATE_COMMUNITY_POSTS_BY_CHANNEL" => Some(ChannelFeed::CommunityPosts),
            _ => None,
        };
        if let Some(feed) = feed {
            return Ok(Some(Self::UpdateFeed(feed, payload(data)?)));
        }

        Ok(Some(match action {
            "FIND" => Self::Find,
            "UPDATE_SHORTS_WITH_CHANNEL_PAGE_SHORTS_BY_CHANNEL" => Self::UpdateShortsWithChannelPageShorts(payload(data)?),
            "DELETE_MANY" => Self::DeleteMany(payload(data)?),
            "DELETE_ALL" => Self::DeleteAll,
            _ => return Ok(None),
        }))
    }

    pub(super) async fn apply(self, store: &StoreDb, data: Value) -> Result<Applied, Error> {
        match self {
            Self::Find => Ok(Applied::reply(Value::Array(store.find_subscription_cache().await?))),
            Self::UpdateFeed(feed, update) => {
                store
                    .update_channel_feed(feed, &update.channel_id, update.entries, update.timestamp)
                    .await?;
                Ok(Applied::synced(feed_sync_kind(feed), data))
            }
            Self::UpdateShortsWithChannelPageShorts(update) => {
                store
                    .update_shorts_with_channel_page_shorts(&update.channel_id, update.entries)
                    .await?;
                Ok(Applied::synced(SyncKind::UpdateShortsWithChannelPageShortsByChannel, data))
            }
            Self::DeleteMany(ids) => {
                store.delete_subscription_cache_channels(ids).await?;
                Ok(Applied::synced(SyncKind::DeleteMany, data))
            }
            Self::DeleteAll => {
                store.delete_all_subscription_cache().await?;
                Ok(Applied::synced(SyncKind::DeleteAll, data))
            }
        }
    }
}
