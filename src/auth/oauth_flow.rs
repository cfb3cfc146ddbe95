//! OAuth認可フローモジュール
//!
//! 認可プロトコル自体はyup-oauth2へ委譲し、ここでは取得と更新の
//! 2操作だけを公開します。ブラウザでの同意フロー（ローカル
//! リダイレクト待ち受けはyup-oauth2内のfutureが処理）と、
//! サービスアカウントによる非対話フローの2モードをサポートします。

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use yup_oauth2::storage::{TokenInfo, TokenStorage, TokenStorageError};
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod, ServiceAccountAuthenticator};

use super::{AuthError, AuthResult, Credential};

/// YouTube Data APIに要求するスコープ（最小構成）
pub const YOUTUBE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube",
    "https://www.googleapis.com/auth/youtube.readonly",
];

/// 外部の認可交換。取得と更新の2操作のみ
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// 新規に認可情報を取得する
    async fn exchange(&self) -> AuthResult<Credential>;

    /// 既存の認可情報を更新する
    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential>;
}

/// 認可フローの種類
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// ブラウザでの同意フロー（client_secrets.json）
    Interactive { client_secret_path: PathBuf },
    /// サービスアカウント（非対話）
    ServiceAccount { key_path: PathBuf },
}

/// yup-oauth2ベースのTokenProvider実装
pub struct OauthTokenProvider {
    mode: AuthMode,
}

impl OauthTokenProvider {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Authenticatorが読み書きするトークンを捕捉するインメモリストレージ。
///
/// リフレッシュトークンと有効期限はストレージフック経由でしか観測
/// できないため、ここで捕捉してCredentialへ写し取る。スコープの
/// 組は単一なのでキーとしては扱わない。
#[derive(Clone, Default)]
struct CapturingStorage {
    seed: Arc<Mutex<Option<TokenInfo>>>,
    captured: Arc<Mutex<Option<TokenInfo>>>,
}

impl CapturingStorage {
    /// 既存のCredentialを初期値として持つストレージを作成
    fn seeded(credential: &Credential) -> Self {
        let info = TokenInfo {
            access_token: Some(credential.access_token.clone()),
            refresh_token: credential.refresh_token.clone(),
            expires_at: credential.expires_at.map(to_offset_datetime),
            id_token: None,
        };
        Self {
            seed: Arc::new(Mutex::new(Some(info))),
            captured: Arc::new(Mutex::new(None)),
        }
    }

    /// Authenticatorが保存した最新のトークンを取り出す
    fn take_captured(&self) -> Option<TokenInfo> {
        lock_or_recover(&self.captured).clone()
    }
}

#[async_trait]
impl TokenStorage for CapturingStorage {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> Result<(), TokenStorageError> {
        *lock_or_recover(&self.captured) = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        // 直近に捕捉したトークンがあればそれを優先
        if let Some(token) = lock_or_recover(&self.captured).clone() {
            return Some(token);
        }
        lock_or_recover(&self.seed).clone()
    }
}

fn to_offset_datetime(value: DateTime<Utc>) -> time::OffsetDateTime {
    time::OffsetDateTime::from_unix_timestamp(value.timestamp())
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
}

fn from_offset_datetime(value: time::OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.unix_timestamp(), 0)
}

/// ストレージ経由で捕捉したTokenInfoからCredentialを組み立てる
fn credential_from_info(info: TokenInfo) -> AuthResult<Credential> {
    let access_token = info.access_token.ok_or_else(|| {
        AuthError::AcquireFailed("authorization flow returned no access token".into())
    })?;
    Ok(Credential::new(
        access_token,
        info.refresh_token,
        info.expires_at.and_then(from_offset_datetime),
    ))
}

/// AccessTokenからCredentialを組み立てる（リフレッシュトークンなし）
fn credential_from_access_token(token: &yup_oauth2::AccessToken) -> AuthResult<Credential> {
    let access_token = token.token().map(str::to_string).ok_or_else(|| {
        AuthError::AcquireFailed("authorization flow returned no access token".into())
    })?;
    Ok(Credential::new(
        access_token,
        None,
        token.expiration_time().and_then(from_offset_datetime),
    ))
}

/// 捕捉したTokenInfoを優先し、無ければAccessTokenへフォールバック
fn credential_from_capture(
    captured: Option<TokenInfo>,
    fallback: &yup_oauth2::AccessToken,
) -> AuthResult<Credential> {
    match captured {
        Some(info) if info.access_token.is_some() => credential_from_info(info),
        _ => credential_from_access_token(fallback),
    }
}

#[async_trait]
impl TokenProvider for OauthTokenProvider {
    async fn exchange(&self) -> AuthResult<Credential> {
        match &self.mode {
            AuthMode::Interactive { client_secret_path } => {
                let secret = yup_oauth2::read_application_secret(client_secret_path)
                    .await
                    .map_err(|e| {
                        AuthError::AcquireFailed(format!(
                            "failed to read client secret {}: {}",
                            client_secret_path.display(),
                            e
                        ))
                    })?;

                let storage = CapturingStorage::default();
                let authenticator = InstalledFlowAuthenticator::builder(
                    secret,
                    InstalledFlowReturnMethod::HTTPRedirect,
                )
                .with_storage(Box::new(storage.clone()))
                .build()
                .await
                .map_err(|e| AuthError::AcquireFailed(e.to_string()))?;

                tracing::info!("🌐 Opening browser for the OAuth consent flow");
                let token = authenticator
                    .token(YOUTUBE_SCOPES)
                    .await
                    .map_err(|e| AuthError::AcquireFailed(e.to_string()))?;

                credential_from_capture(storage.take_captured(), &token)
            }
            AuthMode::ServiceAccount { key_path } => {
                let key = yup_oauth2::read_service_account_key(key_path)
                    .await
                    .map_err(|e| {
                        AuthError::AcquireFailed(format!(
                            "failed to read service account key {}: {}",
                            key_path.display(),
                            e
                        ))
                    })?;

                let authenticator = ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(|e| AuthError::AcquireFailed(e.to_string()))?;

                let token = authenticator
                    .token(YOUTUBE_SCOPES)
                    .await
                    .map_err(|e| AuthError::AcquireFailed(e.to_string()))?;

                credential_from_access_token(&token)
            }
        }
    }

    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential> {
        match &self.mode {
            AuthMode::Interactive { client_secret_path } => {
                if credential.refresh_token.is_none() {
                    return Err(AuthError::NotRefreshable);
                }

                let secret = yup_oauth2::read_application_secret(client_secret_path)
                    .await
                    .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

                let storage = CapturingStorage::seeded(credential);
                let authenticator = InstalledFlowAuthenticator::builder(
                    secret,
                    InstalledFlowReturnMethod::HTTPRedirect,
                )
                .with_storage(Box::new(storage.clone()))
                .build()
                .await
                .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

                let token = authenticator
                    .force_refreshed_token(YOUTUBE_SCOPES)
                    .await
                    .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

                credential_from_capture(storage.take_captured(), &token)
            }
            // サービスアカウントは都度トークンを発行し直す
            AuthMode::ServiceAccount { .. } => self.exchange().await,
        }
    }
}
