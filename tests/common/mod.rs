//! Shared mock transport for controller tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use chabo::api::live_chat::{
    ChatMessage, ChatPage, LiveChatId, MessageKind, OutboundReply, PageToken, VideoId,
};
use chabo::api::youtube::{ApiError, ApiResult, ChatApi};

/// Remote calls the controller made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe,
    Resolve(String),
    List(Option<String>),
    Post { chat_id: String, text: String },
}

/// Scripted in-memory transport implementing [`ChatApi`].
#[derive(Clone)]
pub struct MockChatApi {
    inner: Arc<Inner>,
}

struct Inner {
    probe_ok: bool,
    chat_id: Option<String>,
    list_steps: Mutex<VecDeque<ApiResult<ChatPage>>>,
    post_steps: Mutex<VecDeque<ApiResult<()>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockChatApi {
    /// `chat_id` of `None` makes `resolve_chat_id` fail with `NotFound`.
    pub fn new(probe_ok: bool, chat_id: Option<&str>) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe_ok,
                chat_id: chat_id.map(str::to_string),
                list_steps: Mutex::new(VecDeque::new()),
                post_steps: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn push_page(&self, page: ChatPage) {
        self.inner.list_steps.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_list_error(&self, error: ApiError) {
        self.inner.list_steps.lock().unwrap().push_back(Err(error));
    }

    pub fn push_post_result(&self, result: ApiResult<()>) {
        self.inner.post_steps.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Page tokens of the recorded list calls, in order.
    pub fn list_tokens(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::List(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    /// Bodies of the recorded post calls, in order.
    pub fn posted_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn resolve_chat_id(&self, video_id: &VideoId) -> ApiResult<LiveChatId> {
        self.record(Call::Resolve(video_id.0.clone()));
        self.inner
            .chat_id
            .clone()
            .map(LiveChatId)
            .ok_or(ApiError::NotFound)
    }

    async fn list_messages(
        &self,
        _chat_id: &LiveChatId,
        page_token: Option<&PageToken>,
    ) -> ApiResult<ChatPage> {
        self.record(Call::List(page_token.map(|token| token.0.clone())));
        self.inner
            .list_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::EmptyPage))
    }

    async fn post_message(&self, reply: &OutboundReply) -> ApiResult<()> {
        self.record(Call::Post {
            chat_id: reply.live_chat_id.0.clone(),
            text: reply.text.clone(),
        });
        self.inner
            .post_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn probe_permissions(&self) -> ApiResult<bool> {
        self.record(Call::Probe);
        Ok(self.inner.probe_ok)
    }
}

pub fn text_message(author: &str, text: &str) -> ChatMessage {
    ChatMessage {
        author: author.to_string(),
        text: text.to_string(),
        kind: MessageKind::TextMessage,
    }
}

pub fn event_message(author: &str, text: &str, kind: MessageKind) -> ChatMessage {
    ChatMessage {
        author: author.to_string(),
        text: text.to_string(),
        kind,
    }
}

pub fn page(items: Vec<ChatMessage>, next: Option<&str>, interval_ms: u64) -> ChatPage {
    ChatPage {
        items,
        next_page_token: next.map(|token| PageToken(token.to_string())),
        polling_interval: Duration::from_millis(interval_ms),
    }
}
