//! Typed data model for the YouTube Live Chat API.
//!
//! This module provides the wire structures returned by the Data API v3
//! endpoints and the domain types the rest of the bot works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier of a YouTube video (the `v=` parameter of a watch page).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Extract a video id from a bare id, a `watch?v=` URL or a `youtu.be/` URL.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(start) = input.find("v=") {
            let id_part = &input[start + 2..];
            let id = match id_part.find('&') {
                Some(end) => &id_part[..end],
                None => id_part,
            };
            if id.is_empty() {
                return None;
            }
            Some(Self(id.to_string()))
        } else if input.contains("youtu.be/") {
            let start = input.rfind('/')?;
            let id_part = &input[start + 1..];
            let id = match id_part.find('?') {
                Some(end) => &id_part[..end],
                None => id_part,
            };
            if id.is_empty() {
                return None;
            }
            Some(Self(id.to_string()))
        } else if !input.contains('/') && !input.contains('?') {
            // 素のIDとして扱う
            Some(Self(input.to_string()))
        } else {
            None
        }
    }
}

/// Identifier of the active live chat attached to a live broadcast.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveChatId(pub String);

/// Pagination cursor returned by the `liveChat/messages` endpoint.
///
/// Cursors are forward-only and must be passed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(pub String);

/// Kind of a live chat event.
///
/// The remote API keeps adding event types, so unknown kinds deserialize
/// to [`MessageKind::Unknown`] instead of failing the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MessageKind {
    #[serde(rename = "textMessageEvent")]
    TextMessage,
    #[serde(rename = "superChatEvent")]
    SuperChat,
    #[serde(rename = "superStickerEvent")]
    SuperSticker,
    #[serde(rename = "newSponsorEvent")]
    NewSponsor,
    #[serde(rename = "memberMilestoneChatEvent")]
    MemberMilestone,
    #[serde(rename = "messageDeletedEvent")]
    MessageDeleted,
    #[serde(rename = "chatEndedEvent")]
    ChatEnded,
    #[serde(other)]
    #[default]
    Unknown,
}

/// A single chat message as seen by the responder.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Display name of the author
    pub author: String,
    /// Rendered message text (empty for events without a body)
    pub text: String,
    /// Event kind of the message
    pub kind: MessageKind,
}

/// One page of chat messages plus the server-driven paging state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPage {
    /// Messages in arrival order
    pub items: Vec<ChatMessage>,
    /// Cursor for the next fetch; absent once the chat has ended
    pub next_page_token: Option<PageToken>,
    /// Server-suggested wait before the next fetch
    pub polling_interval: Duration,
}

/// A reply the bot wants to post back into the chat.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundReply {
    /// Chat the reply is addressed to
    pub live_chat_id: LiveChatId,
    /// Reply body
    pub text: String,
}

/// Raw response of `videos.list` with `part=liveStreamingDetails`.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

/// A single video resource carrying its live streaming metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResource {
    #[serde(rename = "liveStreamingDetails")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

/// Live streaming metadata of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveStreamingDetails {
    /// Chat id of the broadcast; absent when the video is not currently live
    #[serde(rename = "activeLiveChatId")]
    pub active_live_chat_id: Option<String>,
}

/// Raw response of `liveChatMessages.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageListResponse {
    #[serde(default)]
    pub items: Vec<MessageResource>,
    /// Cursor for the next page (may be absent in some responses)
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    /// Suggested wait before the next fetch, in milliseconds
    #[serde(rename = "pollingIntervalMillis")]
    pub polling_interval_millis: Option<u64>,
}

/// A single live chat message resource.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResource {
    pub snippet: MessageSnippet,
    #[serde(rename = "authorDetails")]
    pub author_details: Option<AuthorDetails>,
}

/// The `snippet` part of a live chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageSnippet {
    /// Event kind of the message
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Rendered text of the message, absent for non-text events
    #[serde(rename = "displayMessage")]
    pub display_message: Option<String>,
    /// Publication timestamp
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

/// The `authorDetails` part of a live chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorDetails {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,
}

impl From<MessageResource> for ChatMessage {
    fn from(resource: MessageResource) -> Self {
        let author = resource
            .author_details
            .map(|details| details.display_name)
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            author,
            text: resource.snippet.display_message.unwrap_or_default(),
            kind: resource.snippet.kind,
        }
    }
}
