//! キーワード応答モジュール
//!
//! 受信したチャットメッセージから定型応答を導出する純粋ロジック。
//! 状態は持たず、`!time`だけが注入されたクロックに依存します。

use chrono::NaiveTime;

use crate::api::live_chat::{ChatMessage, LiveChatId, MessageKind, OutboundReply};

/// 現在時刻の供給源。テストでは固定クロックを注入する
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// プロセスローカルの実時刻
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// キーワードマッチによる定型応答の導出
pub struct MessageResponder {
    clock: Box<dyn Clock>,
}

impl MessageResponder {
    pub fn new() -> Self {
        Self {
            clock: Box::new(SystemClock),
        }
    }

    /// クロックを差し替えて作成（テスト用）
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self { clock }
    }

    /// メッセージに対する応答を導出する。
    ///
    /// テキストイベント以外は無視。キーワードは大文字小文字を
    /// 区別せず、固定の優先順で最初にマッチした節が勝つ:
    /// hello > help > !about > !time
    pub fn respond(
        &self,
        message: &ChatMessage,
        live_chat_id: &LiveChatId,
    ) -> Option<OutboundReply> {
        if message.kind != MessageKind::TextMessage {
            return None;
        }

        let text = message.text.to_lowercase();
        let reply = if text.contains("hello") {
            format!("Hello {}! 👋", message.author)
        } else if text.contains("help") {
            "Available commands: !help, !about, !time".to_string()
        } else if text.contains("!about") {
            "I'm chabo, an automated YouTube Live Chat responder!".to_string()
        } else if text.contains("!time") {
            format!("Current time: {}", self.clock.now().format("%H:%M:%S"))
        } else {
            return None;
        };

        Some(OutboundReply {
            live_chat_id: live_chat_id.clone(),
            text: reply,
        })
    }
}

impl Default for MessageResponder {
    fn default() -> Self {
        Self::new()
    }
}
