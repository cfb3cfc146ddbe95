//! ポーリングループ制御モジュール
//!
//! 認証済みクライアントでチャットIDを解決し、ページ取得→応答→投稿→待機の
//! 定常ループを駆動します。一時的なエラーはローカルで固定待機リトライし、
//! セットアップ段階の失敗だけを呼び出し元へ伝播します。

use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::live_chat::{LiveChatId, PageToken, VideoId};
use crate::api::youtube::{ApiError, ChatApi};
use crate::auth::{self, AuthError, Credential, CredentialStore, TokenProvider};
use crate::responder::MessageResponder;

/// 診断ログを出す連続エラー数のしきい値
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Botのセットアップ・実行時エラー
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Permission probe failed: the authorized account cannot read its own channel")]
    PermissionDenied,
    #[error("No active live chat for video {0}")]
    StreamNotLive(VideoId),
    #[error("API error during setup: {0}")]
    Setup(#[from] ApiError),
}

/// ループ終了の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 利用者による停止シグナル
    Cancelled,
    /// サーバーが次ページトークンを返さなくなった（チャット終了）
    ChatEnded,
}

/// 1回の実行の集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: u64,
    pub messages_seen: u64,
    pub replies_posted: u64,
    pub stop_reason: StopReason,
}

/// ポーリング動作の調整値
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// 一時エラー後の固定リトライ待機
    pub fallback_delay: Duration,
    /// 1リクエストあたりのHTTPタイムアウト
    pub request_timeout: Duration,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            fallback_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// ライブチャットBot本体
pub struct LiveChatBot<C> {
    api: C,
    responder: MessageResponder,
    options: BotOptions,
}

impl<C: ChatApi> LiveChatBot<C> {
    pub fn new(api: C, responder: MessageResponder, options: BotOptions) -> Self {
        Self {
            api,
            responder,
            options,
        }
    }

    /// 権限確認→チャットID解決→定常ループ。
    ///
    /// `shutdown`への送信でループはイテレーション境界で停止する。
    pub async fn run(
        &self,
        video_id: &VideoId,
        mut shutdown: mpsc::UnboundedReceiver<()>,
    ) -> Result<RunSummary, BotError> {
        if !self.api.probe_permissions().await? {
            return Err(BotError::PermissionDenied);
        }
        tracing::info!("✅ API access verified");

        let live_chat_id = match self.api.resolve_chat_id(video_id).await {
            Ok(id) => id,
            Err(ApiError::NotFound) => return Err(BotError::StreamNotLive(video_id.clone())),
            Err(e) => return Err(BotError::Setup(e)),
        };
        tracing::info!("💬 Connected to live chat {}", live_chat_id);

        self.poll_loop(&live_chat_id, &mut shutdown).await
    }

    /// 定常ループ。取得エラーは状態遷移せず同じページトークンでリトライする
    async fn poll_loop(
        &self,
        live_chat_id: &LiveChatId,
        shutdown: &mut mpsc::UnboundedReceiver<()>,
    ) -> Result<RunSummary, BotError> {
        let mut summary = RunSummary {
            pages_fetched: 0,
            messages_seen: 0,
            replies_posted: 0,
            stop_reason: StopReason::Cancelled,
        };
        let mut page_token: Option<PageToken> = None;
        let mut consecutive_errors: u32 = 0;

        tracing::info!("🚀 Poll loop started, press Ctrl+C to stop");

        loop {
            let delay = match self.api.list_messages(live_chat_id, page_token.as_ref()).await {
                Ok(page) => {
                    consecutive_errors = 0;
                    summary.pages_fetched += 1;
                    summary.messages_seen += page.items.len() as u64;

                    if page.items.is_empty() {
                        tracing::debug!("📪 Page #{} carried no new messages", summary.pages_fetched);
                    } else {
                        tracing::debug!(
                            "📬 Page #{}: {} messages",
                            summary.pages_fetched,
                            page.items.len()
                        );
                    }

                    for message in &page.items {
                        if let Some(reply) = self.responder.respond(message, live_chat_id) {
                            match self.api.post_message(&reply).await {
                                Ok(()) => {
                                    summary.replies_posted += 1;
                                    tracing::info!(
                                        "📤 Replied to {}: {}",
                                        message.author,
                                        reply.text
                                    );
                                }
                                Err(e) => {
                                    // 投稿はリトライしない（重複投稿を避けて継続を優先）
                                    tracing::warn!(
                                        "⚠️ Failed to post reply to {}: {}",
                                        message.author,
                                        e
                                    );
                                }
                            }
                        }
                    }

                    match page.next_page_token {
                        Some(next) => page_token = Some(next),
                        None => {
                            tracing::info!(
                                "🏁 Server returned no continuation, live chat has ended"
                            );
                            summary.stop_reason = StopReason::ChatEnded;
                            return Ok(summary);
                        }
                    }

                    page.polling_interval
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        "⚠️ Fetch failed (consecutive: {}), retrying with the same page token: {}",
                        consecutive_errors,
                        e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        diagnose(&e, consecutive_errors);
                    }
                    self.options.fallback_delay
                }
            };

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("🛑 Shutdown signal received, stopping poll loop");
                    summary.stop_reason = StopReason::Cancelled;
                    return Ok(summary);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// 連続エラー時の診断ログ
fn diagnose(error: &ApiError, consecutive: u32) {
    tracing::error!("🚨 {} consecutive fetch failures. This may indicate:", consecutive);
    match error {
        ApiError::PermissionDenied(_) => {
            tracing::error!("   - The access token expired or lost its scopes");
        }
        ApiError::Api { status: 429, .. } => {
            tracing::error!("   - YouTube API quota exhausted or rate limited");
        }
        ApiError::NotFound => {
            tracing::error!("   - The stream ended or the chat was disabled");
        }
        ApiError::Request(_) => {
            tracing::error!("   - Network connectivity issues");
        }
        _ => {
            tracing::error!("   - The live chat may no longer be reachable");
        }
    }
}

/// 認証から定常ループまでの一連のセットアップを実行する。
///
/// 認証に失敗した場合はAPIクライアントを構築せず、リモート呼び出しを
/// 一切行わずに終了する。
pub async fn launch<C, F>(
    store: &CredentialStore,
    provider: &dyn TokenProvider,
    make_api: F,
    video_id: &VideoId,
    options: BotOptions,
    shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<RunSummary, BotError>
where
    C: ChatApi,
    F: FnOnce(&Credential) -> Result<C, ApiError>,
{
    let credential = auth::obtain_credential(store, provider).await?;
    let api = make_api(&credential)?;
    let bot = LiveChatBot::new(api, MessageResponder::new(), options);
    bot.run(video_id, shutdown).await
}
