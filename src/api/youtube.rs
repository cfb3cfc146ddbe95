use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::api::live_chat::{
    ChatMessage, ChatPage, LiveChatId, MessageListResponse, OutboundReply, PageToken, VideoId,
    VideoListResponse,
};

/// Data API v3のベースURL
pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Video not found or not currently live")]
    NotFound,
    #[error("Insufficient permissions: {0}")]
    PermissionDenied(String),
    #[error("YouTube API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Response carried no polling metadata")]
    EmptyPage,
}

impl ApiError {
    /// ポーリングループが同じカーソルでリトライしてよいエラーか
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Request(_) | ApiError::EmptyPage => true,
            ApiError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// チャットAPIの3操作と権限プローブ。
///
/// リトライはどの操作も行わない（リトライはループ制御側の責務）。
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// 配信のアクティブなライブチャットIDを解決する
    async fn resolve_chat_id(&self, video_id: &VideoId) -> ApiResult<LiveChatId>;

    /// チャットメッセージを1ページ取得する。`page_token`は前ページの値をそのまま渡す
    async fn list_messages(
        &self,
        chat_id: &LiveChatId,
        page_token: Option<&PageToken>,
    ) -> ApiResult<ChatPage>;

    /// チャットへメッセージを投稿する
    async fn post_message(&self, reply: &OutboundReply) -> ApiResult<()>;

    /// 認可済みアカウントが自身のチャンネル情報を読めるか確認する
    async fn probe_permissions(&self) -> ApiResult<bool>;
}

/// reqwestベースのYouTube Data API v3クライアント
#[derive(Debug, Clone)]
pub struct YouTubeChatApi {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl YouTubeChatApi {
    pub fn new(access_token: impl Into<String>, request_timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: YOUTUBE_API_BASE_URL.to_string(),
            access_token: access_token.into(),
        })
    }

    /// ベースURLを差し替える（検証用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// エラーレスポンスをApiErrorへ変換する
    fn error_from_response(status: u16, body: &str) -> ApiError {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("error")?
                    .get("message")?
                    .as_str()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status {
            401 | 403 => ApiError::PermissionDenied(message),
            404 => ApiError::NotFound,
            _ => ApiError::Api { status, message },
        }
    }
}

#[async_trait]
impl ChatApi for YouTubeChatApi {
    async fn resolve_chat_id(&self, video_id: &VideoId) -> ApiResult<LiveChatId> {
        let url = format!("{}/videos", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("part", "liveStreamingDetails"), ("id", video_id.0.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        let parsed: VideoListResponse = serde_json::from_str(&body)?;
        parsed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.live_streaming_details)
            .and_then(|details| details.active_live_chat_id)
            .map(LiveChatId)
            .ok_or(ApiError::NotFound)
    }

    async fn list_messages(
        &self,
        chat_id: &LiveChatId,
        page_token: Option<&PageToken>,
    ) -> ApiResult<ChatPage> {
        let url = format!("{}/liveChat/messages", self.base_url);
        let mut query = vec![
            ("liveChatId", chat_id.0.clone()),
            ("part", "snippet,authorDetails".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.0.clone()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        let parsed: MessageListResponse = serde_json::from_str(&body)?;
        let polling_interval = match parsed.polling_interval_millis {
            Some(millis) if millis > 0 => Duration::from_millis(millis),
            // メタデータを欠いたレスポンスはnullページ扱い
            _ => return Err(ApiError::EmptyPage),
        };

        Ok(ChatPage {
            items: parsed.items.into_iter().map(ChatMessage::from).collect(),
            next_page_token: parsed.next_page_token.map(PageToken),
            polling_interval,
        })
    }

    async fn post_message(&self, reply: &OutboundReply) -> ApiResult<()> {
        let url = format!("{}/liveChat/messages", self.base_url);
        let body = json!({
            "snippet": {
                "liveChatId": reply.live_chat_id.0.as_str(),
                "type": "textMessageEvent",
                "textMessageDetails": {
                    "messageText": reply.text.as_str(),
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        Ok(())
    }

    async fn probe_permissions(&self) -> ApiResult<bool> {
        let url = format!("{}/channels", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("part", "id"), ("mine", "true")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(false);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::error_from_response(status.as_u16(), &body));
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        let has_channel = json
            .get("items")
            .and_then(|items| items.as_array())
            .map(|items| !items.is_empty())
            .unwrap_or(false);

        Ok(has_channel)
    }
}
