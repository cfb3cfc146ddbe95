//! OAuth認証モジュール
//!
//! YouTube Data APIへのアクセスに必要な認可情報の取得・更新・永続化を提供します。
//!
//! ## 機能
//!
//! - 認可情報の保存・読み込み（バージョン付きTOML）
//! - yup-oauth2への委譲によるトークン取得・リフレッシュ
//! - 復旧ポリシー（再利用 → リフレッシュ → 破棄して再取得）

mod credential_store;
mod oauth_flow;

pub use credential_store::{Credential, CredentialStore};
pub use oauth_flow::{AuthMode, OauthTokenProvider, TokenProvider, YOUTUBE_SCOPES};

use chrono::Utc;

/// 認証関連のエラー型
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 新規認可フローの失敗
    #[error("Authorization flow failed: {0}")]
    AcquireFailed(String),

    /// トークンのリフレッシュ失敗
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// リフレッシュトークンなし
    #[error("Credential has no refresh token")]
    NotRefreshable,

    /// 認可情報の保存エラー
    #[error("Failed to persist credential: {0}")]
    SaveError(String),

    /// I/Oエラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML解析エラー
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOMLシリアライズエラー
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// 保存済み認可情報の再利用・更新・新規取得を一括して行う。
///
/// 復旧ポリシー: 保存済みが未失効ならそのまま使う。失効していれば
/// リフレッシュを試み、失敗した場合は保存済みの認可情報を破棄して
/// 新規認可フローへフォールバックする。新規取得も失敗したらエラー
/// （無限再帰を防ぐため、それ以上はリトライしない）。
///
/// 取得・更新に成功するたびにストアへ永続化する。
pub async fn obtain_credential(
    store: &CredentialStore,
    provider: &dyn TokenProvider,
) -> AuthResult<Credential> {
    if let Some(credential) = store.load() {
        if !credential.is_expired(Utc::now()) {
            tracing::info!("✅ Using stored credential from {}", store.path().display());
            return Ok(credential);
        }

        if credential.refresh_token.is_some() {
            tracing::info!("🔄 Stored credential expired, attempting refresh");
            match provider.refresh(&credential).await {
                Ok(refreshed) => {
                    store.save(&refreshed)?;
                    tracing::info!("💾 Refreshed credential persisted");
                    return Ok(refreshed);
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Token refresh failed, falling back to a new authorization: {}",
                        e
                    );
                    store.delete()?;
                }
            }
        } else {
            tracing::info!("Stored credential expired and not refreshable, discarding");
            store.delete()?;
        }
    }

    let credential = provider.exchange().await?;
    store.save(&credential)?;
    tracing::info!("💾 Credential persisted to {}", store.path().display());
    Ok(credential)
}
