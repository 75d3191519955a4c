//! Inbound engagement events as they arrive on the wire.
//!
//! [`EngagementEvent`] is the JSON message value published by the platform
//! parsers. Field names are snake_case and match the producer exactly.
//! Unknown fields are ignored; producers frequently emit `null` for counters
//! and strings they could not scrape, so every non-optional field decodes
//! `null` (or absence) as its zero value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Discriminator value that triggers persistence. All other data types are
/// accepted on the wire and silently ignored by the store.
pub const VIDEO_DATA_TYPE: &str = "video";

/// One inbound observation of a content item's metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementEvent {
    /// Platform identifier (e.g. `"tiktok"`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    /// Producer-side observation time. Informational only; ordering fields
    /// in the store use server time.
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    /// Payload kind discriminator; only [`VIDEO_DATA_TYPE`] is persisted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_type: String,
    /// Content item snapshot.
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: Payload,
}

impl EngagementEvent {
    /// Decodes an event from a raw message value.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the bytes are not a
    /// JSON object matching the event schema.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns `true` when this event should be persisted.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.data_type == VIDEO_DATA_TYPE
    }
}

/// Content item fields carried by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payload {
    /// Stable identifier of the content item on its platform. Aggregate key.
    #[serde(default, deserialize_with = "null_as_default")]
    pub platform_id: String,
    /// Caption / title text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Original publish time, absent when the platform does not expose it.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Canonical URL of the item.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Cumulative engagement counters.
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: Stats,
    /// Platform-specific extras.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_meta: ContentMeta,
    /// Publishing account.
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: Author,
}

/// Cumulative engagement counters.
///
/// Producers report monotonically growing values, but late or replayed
/// messages can carry lower ones; nothing downstream assumes monotonicity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Stats {
    /// Play / view count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
    /// Like count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u64,
    /// Comment count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: u64,
    /// Share count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub shares: u64,
}

/// Platform-specific content metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContentMeta {
    /// Duration in seconds, `0` when unknown.
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: u64,
    /// Hashtags without the leading `#`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: Vec<String>,
    /// Soundtrack title, when the platform has one.
    #[serde(default)]
    pub music_title: Option<String>,
    /// Whether the soundtrack is original to the item.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_original_sound: bool,
}

/// Publishing account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Author {
    /// Account handle.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Follower count at observation time.
    #[serde(default)]
    pub follower_count: Option<u64>,
}

/// Decodes `null` as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
