//! Post types for the v1.1 `statuses/user_timeline` payload.
//!
//! Only the fields enrichment reads are modelled. Everything else the API
//! sends is kept in the flattened `extra` maps so a post serializes back with
//! its pass-through fields intact.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::format::format_text;

const PHOTO_MEDIA_TYPE: &str = "photo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_str: Option<String>,
    pub text: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Box<RawPost>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Entities>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub screen_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<HashtagEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mentions: Option<Vec<MentionEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<UrlEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaEntity>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Character offsets `[start, end)` of an entity inside the post text.
pub type Indices = [usize; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Indices>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionEntity {
    pub screen_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Indices>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntity {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Indices>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url_https: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Indices>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawPost {
    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    pub fn media(&self) -> &[MediaEntity] {
        self.entities
            .as_ref()
            .and_then(|e| e.media.as_deref())
            .unwrap_or_default()
    }

    /// `media_url` of every photo attachment, in the order the API lists them.
    pub fn photo_urls(&self) -> Vec<String> {
        self.media()
            .iter()
            .filter(|m| m.kind == PHOTO_MEDIA_TYPE)
            .map(|m| m.media_url.clone())
            .collect()
    }
}

/// A post together with the presentation fields derived from it at fetch
/// time. Serializes as the raw post with the derived fields added alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPost {
    #[serde(flatten)]
    post: RawPost,
    display_text: String,
    is_retweet: bool,
    media_photo_urls: Vec<String>,
    has_media_photo: bool,
    primary_media_photo_url: Option<String>,
}

impl EnrichedPost {
    pub fn enrich(post: RawPost, show_retweeted_by: bool) -> Self {
        let display_text = format_text(&post, show_retweeted_by);
        let media_photo_urls = post.photo_urls();
        let primary_media_photo_url = media_photo_urls.first().cloned();

        Self {
            is_retweet: post.is_retweet(),
            has_media_photo: !media_photo_urls.is_empty(),
            display_text,
            media_photo_urls,
            primary_media_photo_url,
            post,
        }
    }

    pub fn post(&self) -> &RawPost {
        &self.post
    }

    pub fn into_post(self) -> RawPost {
        self.post
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn is_retweet(&self) -> bool {
        self.is_retweet
    }

    pub fn media_photo_urls(&self) -> &[String] {
        &self.media_photo_urls
    }

    pub fn has_media_photo(&self) -> bool {
        self.has_media_photo
    }

    pub fn primary_media_photo_url(&self) -> Option<&str> {
        self.primary_media_photo_url.as_deref()
    }
}
