use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chabo::api::live_chat::VideoId;
use chabo::api::youtube::YouTubeChatApi;
use chabo::auth::{AuthMode, CredentialStore, OauthTokenProvider, YOUTUBE_SCOPES};
use chabo::bot::{self, BotError, BotOptions, StopReason};
use chabo::config::{AppConfig, ConfigManager};

/// YouTube Live Chat自動応答Bot
#[derive(Debug, Parser)]
#[command(name = "chabo", version, about = "YouTube Live Chat auto-reply bot")]
struct Cli {
    /// 監視対象のライブ配信（動画IDまたはURL、省略時はCHABO_VIDEO_ID）
    video: Option<String>,

    /// 設定ファイルのパス（省略時はXDGデフォルト）
    #[arg(long)]
    config: Option<PathBuf>,

    /// OAuthクライアントシークレットのパス
    #[arg(long)]
    client_secret: Option<PathBuf>,

    /// サービスアカウント鍵のパス（指定時は非対話認証）
    #[arg(long)]
    service_account: Option<PathBuf>,

    /// 認可情報の保存先ディレクトリ
    #[arg(long)]
    credentials_dir: Option<PathBuf>,
}

/// ログ初期化
fn init_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    subscriber.try_init()?;

    Ok(())
}

/// 致命的エラー時の対処手順を表示
fn print_remediation(error: &BotError) {
    match error {
        BotError::Auth(_) => {
            tracing::error!("認証に失敗しました。以下を確認してください:");
            tracing::error!("   1. Google Cloud ConsoleでYouTube Data API v3が有効になっていること");
            tracing::error!("   2. OAuth同意画面に以下のスコープが設定されていること:");
            for scope in YOUTUBE_SCOPES {
                tracing::error!("      - {}", scope);
            }
            tracing::error!("   3. クライアントシークレットのパスが正しいこと");
        }
        BotError::PermissionDenied => {
            tracing::error!("権限の確認に失敗しました。OAuthスコープを確認してください:");
            for scope in YOUTUBE_SCOPES {
                tracing::error!("   - {}", scope);
            }
        }
        BotError::StreamNotLive(video_id) => {
            tracing::error!("動画 {} にアクティブなライブチャットが見つかりません。", video_id);
            tracing::error!("   配信中のライブのIDまたはURLを指定してください。");
        }
        BotError::Setup(_) => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    tracing::info!("🎬 Starting chabo - YouTube Live Chat bot");

    // 設定読み込み
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let config = manager.load_config().unwrap_or_else(|e| {
        tracing::warn!("設定読み込みエラー、デフォルト設定を使用: {}", e);
        AppConfig::default()
    });

    // 対象配信の解決（引数 → 環境変数）
    let raw_target = cli
        .video
        .or_else(|| std::env::var("CHABO_VIDEO_ID").ok())
        .context("no livestream given: pass a video ID/URL or set CHABO_VIDEO_ID")?;
    let video_id = VideoId::parse(&raw_target)
        .with_context(|| format!("could not extract a video ID from {:?}", raw_target))?;

    // 認可フローの選択
    let mode = match cli
        .service_account
        .or_else(|| config.auth.service_account_key_path.clone())
    {
        Some(key_path) => {
            tracing::info!("🔑 Using service account authentication");
            AuthMode::ServiceAccount { key_path }
        }
        None => AuthMode::Interactive {
            client_secret_path: cli
                .client_secret
                .unwrap_or_else(|| config.auth.client_secret_path.clone()),
        },
    };
    let provider = OauthTokenProvider::new(mode);
    let store = match cli.credentials_dir {
        Some(dir) => CredentialStore::new(dir),
        None => CredentialStore::with_default_dir()?,
    };

    let options = BotOptions::from(&config.poll);
    let request_timeout = options.request_timeout;

    // Ctrl+Cでイテレーション境界の停止を要求する
    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            // 送信側をドロップすると停止扱いになるため、保持したまま待機する
            std::future::pending::<()>().await;
        }
        tracing::info!("🛑 終了シグナルを受信しました");
        let _ = shutdown_tx.send(());
    });

    let summary = bot::launch(
        &store,
        &provider,
        |credential| YouTubeChatApi::new(credential.access_token.clone(), request_timeout),
        &video_id,
        options,
        shutdown_rx,
    )
    .await
    .map_err(|e| {
        print_remediation(&e);
        anyhow::anyhow!(e)
    })?;

    match summary.stop_reason {
        StopReason::Cancelled => tracing::info!(
            "👋 Stopped by user: {} pages, {} messages, {} replies",
            summary.pages_fetched,
            summary.messages_seen,
            summary.replies_posted
        ),
        StopReason::ChatEnded => tracing::info!(
            "🏁 Live chat ended: {} pages, {} messages, {} replies",
            summary.pages_fetched,
            summary.messages_seen,
            summary.replies_posted
        ),
    }

    Ok(())
}
