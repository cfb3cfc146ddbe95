//! 認可情報の永続化モジュール
//!
//! 取得したOAuthトークンを単一のTOMLファイルへ保存・読み込みします。
//! フォーマットはバージョン番号付きで、各フィールドを個別に
//! シリアライズします。

use super::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 保存フォーマットのバージョン
const CREDENTIAL_FORMAT_VERSION: u32 = 1;

/// 有効期限判定の安全マージン（秒）
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth認可情報
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    /// アクセストークン
    pub access_token: String,
    /// リフレッシュトークン（インタラクティブフローのみ）
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// アクセストークンの有効期限
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// トークン取得日時
    #[serde(default = "Utc::now")]
    pub acquired_at: DateTime<Utc>,
}

impl Credential {
    /// 新しいCredentialを作成
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
            acquired_at: Utc::now(),
        }
    }

    /// アクセストークンが期限切れか（安全マージン付き）。
    /// 期限が不明なトークンは未失効として扱う。
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    /// 有効（未失効、または更新可能）か
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) || self.refresh_token.is_some()
    }
}

/// 保存ファイルの構造
#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    credential: Credential,
}

/// 認可情報ストア
pub struct CredentialStore {
    /// 保存ファイルのパス
    path: PathBuf,
}

impl CredentialStore {
    /// 新しいCredentialStoreを作成
    ///
    /// # Arguments
    ///
    /// * `config_dir` - 設定ディレクトリのパス（例: ~/.config/chabo）
    pub fn new(config_dir: PathBuf) -> Self {
        let path = config_dir.join("credential.toml");
        Self { path }
    }

    /// デフォルトの設定ディレクトリを使用してCredentialStoreを作成
    pub fn with_default_dir() -> AuthResult<Self> {
        let config_dir = directories::ProjectDirs::from("dev", "sifyfy", "chabo")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| AuthError::SaveError("Failed to determine config directory".into()))?;

        Ok(Self::new(config_dir))
    }

    /// 認可情報を読み込み。ファイルが無い・読めない・バージョンが
    /// 合わない場合はNone
    pub fn load(&self) -> Option<Credential> {
        let content = fs::read_to_string(&self.path).ok()?;

        let file: CredentialFile = match toml::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("⚠️ Stored credential is unreadable, ignoring: {}", e);
                return None;
            }
        };

        if file.version != CREDENTIAL_FORMAT_VERSION {
            tracing::warn!(
                "⚠️ Stored credential has unsupported format version {}, ignoring",
                file.version
            );
            return None;
        }

        Some(file.credential)
    }

    /// 認可情報を保存（テンポラリファイル経由のアトミック書き込み、上書き）
    pub fn save(&self, credential: &Credential) -> AuthResult<()> {
        // ディレクトリが存在しない場合は作成
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = CredentialFile {
            version: CREDENTIAL_FORMAT_VERSION,
            credential: credential.clone(),
        };

        let toml_string = toml::to_string_pretty(&file)?;
        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, toml_string)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    /// 認可情報が存在するか確認
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// 認可情報を削除
    pub fn delete(&self) -> AuthResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// 保存ファイルのパスを取得
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_credential() -> Credential {
        Credential::new(
            "test_access_token".into(),
            Some("test_refresh_token".into()),
            Some(Utc::now() + Duration::hours(1)),
        )
    }

    #[test]
    fn test_credential_is_expired() {
        let now = Utc::now();

        let fresh = Credential::new("t".into(), None, Some(now + Duration::hours(1)));
        assert!(!fresh.is_expired(now));

        let stale = Credential::new("t".into(), None, Some(now - Duration::hours(1)));
        assert!(stale.is_expired(now));

        // マージン内は期限切れ扱い
        let nearly = Credential::new("t".into(), None, Some(now + Duration::seconds(30)));
        assert!(nearly.is_expired(now));

        // 期限不明は未失効扱い
        let unknown = Credential::new("t".into(), None, None);
        assert!(!unknown.is_expired(now));
    }

    #[test]
    fn test_credential_is_valid() {
        let now = Utc::now();

        let expired_refreshable = Credential::new(
            "t".into(),
            Some("refresh".into()),
            Some(now - Duration::hours(1)),
        );
        assert!(expired_refreshable.is_valid(now));

        let expired_plain = Credential::new("t".into(), None, Some(now - Duration::hours(1)));
        assert!(!expired_plain.is_valid(now));
    }

    #[test]
    fn test_credential_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        let credential = create_test_credential();

        // 保存
        store.save(&credential).unwrap();

        // 読み込み（全フィールドが往復する）
        let loaded = store.load().unwrap();

        assert_eq!(loaded.access_token, credential.access_token);
        assert_eq!(loaded.refresh_token, credential.refresh_token);
        assert_eq!(loaded.expires_at, credential.expires_at);
        assert_eq!(loaded.acquired_at, credential.acquired_at);
    }

    #[test]
    fn test_credential_store_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        assert!(store.load().is_none());
    }

    #[test]
    fn test_credential_store_load_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        fs::create_dir_all(temp_dir.path()).unwrap();
        fs::write(store.path(), "not valid toml {{{{").unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_credential_store_load_unsupported_version() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        let content = r#"
version = 99

[credential]
access_token = "t"
acquired_at = "2024-05-01T12:00:00Z"
"#;
        fs::write(store.path(), content).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_credential_store_exists_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        assert!(!store.exists());

        store.save(&create_test_credential()).unwrap();
        assert!(store.exists());

        store.delete().unwrap();
        assert!(!store.exists());

        // 無いファイルの削除はエラーにならない
        store.delete().unwrap();
    }

    #[test]
    fn test_credential_store_overwrites_previous_credential() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        let first = create_test_credential();
        store.save(&first).unwrap();

        let second = Credential::new("second_token".into(), None, None);
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, "second_token");
    }

    #[test]
    fn test_credential_store_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dir");
        let store = CredentialStore::new(nested_path);

        store.save(&create_test_credential()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_credential_file_toml_format() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().to_path_buf());

        store.save(&create_test_credential()).unwrap();

        // TOMLファイルの内容を確認
        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("version = 1"));
        assert!(content.contains("[credential]"));
        assert!(content.contains("access_token = \"test_access_token\""));
        assert!(content.contains("refresh_token = \"test_refresh_token\""));
    }
}
