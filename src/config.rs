//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::bot::BotOptions;

/// 認可関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuthクライアントシークレットのパス
    pub client_secret_path: PathBuf,
    /// サービスアカウント鍵のパス（設定時は非対話モード）
    pub service_account_key_path: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret_path: PathBuf::from("client_secrets.json"),
            service_account_key_path: None,
        }
    }
}

/// ポーリング関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// 一時エラー後のリトライ待機（秒）
    pub fallback_delay_secs: u64,
    /// HTTPリクエストのタイムアウト（秒）
    pub request_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            fallback_delay_secs: 5,
            request_timeout_secs: 15,
        }
    }
}

impl From<&PollConfig> for BotOptions {
    fn from(config: &PollConfig) -> Self {
        Self {
            fallback_delay: Duration::from_secs(config.fallback_delay_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 認可設定
    #[serde(default)]
    pub auth: AuthConfig,

    /// ポーリング設定
    #[serde(default)]
    pub poll: PollConfig,
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        // 設定ディレクトリを作成（存在しない場合）
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        Ok(Self { config_path })
    }

    /// 明示したパスを使用して作成
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// XDGディレクトリに基づく設定ファイルパスを取得
    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "sifyfy", "chabo")
            .context("Failed to get project directories")?;

        let config_dir = project_dirs.config_dir();
        let config_file = config_dir.join("config.toml");

        debug!("Config file path: {}", config_file.display());

        Ok(config_file)
    }

    /// 設定を読み込み。ファイルが無い場合はデフォルト設定
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());

        Ok(())
    }

    /// 設定ファイルが存在するかチェック
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }

    /// 設定ファイルパスを取得
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}
