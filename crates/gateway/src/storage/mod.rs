//! # アップロード先ストレージ
//!
//! Gateway運用者が選択可能なストレージバックエンドの抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。
//!
//! Gatewayはマルチパートアップロードのセッションを保持しない。
//! アップロードID・キーはストレージが発行し、クライアントが各呼び出しで持ち回る。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use self::s3::S3UploadStorage;

use upload_types::CompletedPart;

use crate::error::GatewayError;

/// ストレージが発行したマルチパートアップロードの識別子。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    /// アップロードID
    pub upload_id: String,
    /// オブジェクトキー
    pub key: String,
}

/// アップロード先ストレージの抽象インターフェース。
///
/// AWS S3, MinIO, Cloudflare R2 等のS3互換ストレージや、
/// テスト用のモック実装を差し替えられる。
#[async_trait::async_trait]
pub trait UploadStorage: Send + Sync {
    /// 単一オブジェクトのPUT用署名付きURLを生成する。
    async fn presign_put(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError>;

    /// マルチパートアップロードを開始する。
    async fn initiate_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartSession, GatewayError>;

    /// マルチパートアップロードの1パート分のPUT用署名付きURLを生成する。
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expiry_secs: u32,
    ) -> Result<String, GatewayError>;

    /// パート一覧を渡してマルチパートアップロードを完了する。
    /// `parts` は与えられた順序のまま送信する。
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), GatewayError>;
}
