//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ構築され、`Arc<GatewayState>` として各ハンドラに渡される。

use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

use crate::error::GatewayError;
use crate::storage::UploadStorage;

/// 署名付きURLのデフォルト有効期限（15分）
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u32 = 15 * 60;

/// 署名付きURLの有効期限の上限（SigV4の上限: 7日）
pub const MAX_PRESIGN_EXPIRY_SECS: u32 = 7 * 24 * 60 * 60;

/// オブジェクトキーのデフォルトプレフィックス
pub const DEFAULT_KEY_PREFIX: &str = "uploads/";

/// デフォルトのリッスンアドレス
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// パラメータ検証モード。
///
/// - `Strict`: 数値でない・範囲外のpartNumber、空のparts配列を400で拒否する
/// - `Lenient`: 必須パラメータの欠落のみ拒否し、それ以外はストレージに委ねる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "lenient" => Ok(ValidationMode::Lenient),
            other => Err(anyhow!("未知の検証モード: {other} (strict | lenient)")),
        }
    }
}

/// ストレージ接続設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// リージョン名（AWS_REGION）
    pub region: String,
    /// バケット名（AWS_BUCKET_NAME）
    pub bucket_name: String,
    /// アクセスキー。Noneの場合はrust-s3の認証情報チェーンを使う
    pub access_key: Option<String>,
    /// シークレットキー
    pub secret_key: Option<String>,
    /// S3互換エンドポイント（MinIO等）。NoneならAWS S3
    pub endpoint: Option<String>,
    /// クライアント向け署名URL用エンドポイント。
    /// Docker内部ホスト名と外部ホスト名が異なる場合に使用する。
    pub public_endpoint: Option<String>,
}

/// Gateway設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// リッスンアドレス
    pub bind_addr: String,
    /// オブジェクトキーのプレフィックス
    pub key_prefix: String,
    /// 署名付きURLの有効期限（秒）
    pub presign_expiry_secs: u32,
    /// パラメータ検証モード
    pub validation_mode: ValidationMode,
    /// ストレージエラーの詳細をレスポンスに含めるか
    pub expose_backend_errors: bool,
    /// CORS許可オリジン（"*" は全許可）
    pub cors_allowed_origins: Vec<String>,
    /// ストレージ接続設定
    pub storage: StorageSettings,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ルックアップから構築する。
    /// 空文字列の変数は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bucket_name = var("AWS_BUCKET_NAME").context("AWS_BUCKET_NAMEが設定されていません")?;

        let storage = StorageSettings {
            region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            bucket_name,
            access_key: var("AWS_ACCESS_KEY_ID"),
            secret_key: var("AWS_SECRET_ACCESS_KEY"),
            endpoint: var("S3_ENDPOINT"),
            public_endpoint: var("S3_PUBLIC_ENDPOINT"),
        };

        if storage.access_key.is_some() != storage.secret_key.is_some() {
            bail!("AWS_ACCESS_KEY_IDとAWS_SECRET_ACCESS_KEYは両方設定する必要があります");
        }

        let presign_expiry_secs = match var("PRESIGN_EXPIRY_SECS") {
            Some(raw) => parse_expiry(&raw)?,
            None => DEFAULT_PRESIGN_EXPIRY_SECS,
        };

        let validation_mode = match var("VALIDATION_MODE") {
            Some(raw) => raw
                .parse::<ValidationMode>()
                .context("VALIDATION_MODEが不正です")?,
            None => ValidationMode::default(),
        };

        let expose_backend_errors = match var("EXPOSE_BACKEND_ERRORS") {
            Some(raw) => parse_bool(&raw).context("EXPOSE_BACKEND_ERRORSが不正です")?,
            None => true,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            key_prefix: var("UPLOAD_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            presign_expiry_secs,
            validation_mode,
            expose_backend_errors,
            cors_allowed_origins,
            storage,
        })
    }
}

fn parse_expiry(raw: &str) -> anyhow::Result<u32> {
    let secs: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("PRESIGN_EXPIRY_SECSが数値ではありません: {raw}"))?;
    if secs == 0 || secs > MAX_PRESIGN_EXPIRY_SECS {
        bail!("PRESIGN_EXPIRY_SECSは1〜{MAX_PRESIGN_EXPIRY_SECS}の範囲で指定してください: {secs}");
    }
    Ok(secs)
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow!("真偽値ではありません: {other}")),
    }
}

// ---------------------------------------------------------------------------
// 共有状態
// ---------------------------------------------------------------------------

/// Gatewayの共有状態。
/// 読み取り専用で、リクエスト間で共有される。
pub struct GatewayState {
    /// Gateway設定
    pub config: GatewayConfig,
    /// アップロード先ストレージ（S3互換等、トレイトで抽象化）
    pub storage: Box<dyn UploadStorage>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, storage: Box<dyn UploadStorage>) -> Self {
        Self { config, storage }
    }

    /// クライアント指定のファイル名からオブジェクトキーを導出する。
    pub fn object_key(&self, filename: &str) -> String {
        format!("{}{}", self.config.key_prefix, filename)
    }

    /// ストレージエラーをログに記録し、設定に応じて詳細を隠す。
    pub fn storage_failure(&self, operation: &str, err: GatewayError) -> GatewayError {
        tracing::error!(operation, error = %err, "ストレージ操作に失敗");
        if self.config.expose_backend_errors {
            err
        } else {
            err.redact_storage()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[("AWS_BUCKET_NAME", "media")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.key_prefix, "uploads/");
        assert_eq!(config.presign_expiry_secs, 900);
        assert_eq!(config.validation_mode, ValidationMode::Strict);
        assert!(config.expose_backend_errors);
        assert_eq!(config.cors_allowed_origins, vec!["*"]);
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.bucket_name, "media");
        assert!(config.storage.access_key.is_none());
        assert!(config.storage.endpoint.is_none());
    }

    #[test]
    fn test_bucket_required() {
        assert!(GatewayConfig::from_lookup(lookup(&[])).is_err());
        assert!(GatewayConfig::from_lookup(lookup(&[("AWS_BUCKET_NAME", "")])).is_err());
    }

    #[test]
    fn test_full_environment() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("AWS_BUCKET_NAME", "media"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("S3_ENDPOINT", "http://minio:9000"),
            ("S3_PUBLIC_ENDPOINT", "http://localhost:9000"),
            ("BIND_ADDR", "127.0.0.1:9090"),
            ("UPLOAD_KEY_PREFIX", "incoming/"),
            ("PRESIGN_EXPIRY_SECS", "60"),
            ("VALIDATION_MODE", "Lenient"),
            ("EXPOSE_BACKEND_ERRORS", "false"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.key_prefix, "incoming/");
        assert_eq!(config.presign_expiry_secs, 60);
        assert_eq!(config.validation_mode, ValidationMode::Lenient);
        assert!(!config.expose_backend_errors);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.storage.region, "eu-west-1");
        assert_eq!(config.storage.access_key.as_deref(), Some("AKIA"));
        assert_eq!(config.storage.public_endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [("AWS_BUCKET_NAME", "media")];

        for (name, value) in [
            ("PRESIGN_EXPIRY_SECS", "abc"),
            ("PRESIGN_EXPIRY_SECS", "0"),
            ("PRESIGN_EXPIRY_SECS", "604801"),
            ("VALIDATION_MODE", "loose"),
            ("EXPOSE_BACKEND_ERRORS", "maybe"),
        ] {
            let vars = [base[0], (name, value)];
            assert!(
                GatewayConfig::from_lookup(lookup(&vars)).is_err(),
                "{name}={value} が受理されてしまった"
            );
        }
    }

    #[test]
    fn test_partial_credentials_rejected() {
        let result = GatewayConfig::from_lookup(lookup(&[
            ("AWS_BUCKET_NAME", "media"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
        ]));
        assert!(result.is_err());
    }
}
