//! # S3互換ストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する実装。
//! 署名はrust-s3がローカルで行い、マルチパートの作成・完了のみストレージと通信する。

use std::collections::HashMap;

use s3::serde_types::Part;
use upload_types::CompletedPart;

use super::{MultipartSession, UploadStorage};
use crate::config::StorageSettings;
use crate::error::GatewayError;

/// S3互換ストレージによる実装。
pub struct S3UploadStorage {
    /// API呼び出し用バケット（マルチパート作成・完了）
    bucket_internal: s3::Bucket,
    /// クライアント向けバケット（署名付きURL生成用）。
    /// Docker内部ホスト名と外部ホスト名が異なる場合に使用。
    /// Noneの場合はbucket_internalを使用する。
    bucket_public: Option<s3::Bucket>,
}

impl S3UploadStorage {
    pub fn new(bucket_internal: s3::Bucket, bucket_public: Option<s3::Bucket>) -> Self {
        Self {
            bucket_internal,
            bucket_public,
        }
    }

    /// S3互換バケットを初期化する。
    /// エンドポイント指定時はパススタイルでアクセスする。
    fn init_bucket(
        settings: &StorageSettings,
        endpoint: Option<&str>,
    ) -> anyhow::Result<s3::Bucket> {
        let region = match endpoint {
            Some(endpoint) => s3::Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.to_string(),
            },
            None => settings.region.parse::<s3::Region>()?,
        };

        // 静的キー未設定時は環境変数・プロファイル・インスタンスメタデータから解決される
        let credentials = s3::creds::Credentials::new(
            settings.access_key.as_deref(),
            settings.secret_key.as_deref(),
            None,
            None,
            None,
        )?;

        let bucket = s3::Bucket::new(&settings.bucket_name, region, credentials)?;
        let bucket = if endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(*bucket)
    }

    /// 設定から構築する。
    pub fn from_settings(settings: &StorageSettings) -> anyhow::Result<Self> {
        let bucket_internal = Self::init_bucket(settings, settings.endpoint.as_deref())?;

        let bucket_public = settings
            .public_endpoint
            .as_deref()
            .map(|public_ep| {
                tracing::info!(
                    s3_public_endpoint = %public_ep,
                    "クライアント向けS3エンドポイントを設定"
                );
                Self::init_bucket(settings, Some(public_ep))
            })
            .transpose()?;

        Ok(Self::new(bucket_internal, bucket_public))
    }

    fn signing_bucket(&self) -> &s3::Bucket {
        self.bucket_public.as_ref().unwrap_or(&self.bucket_internal)
    }
}

/// パートアップロードURLに付与するクエリ。
fn part_queries(upload_id: &str, part_number: u32) -> HashMap<String, String> {
    HashMap::from([
        ("partNumber".to_string(), part_number.to_string()),
        ("uploadId".to_string(), upload_id.to_string()),
    ])
}

#[async_trait::async_trait]
impl UploadStorage for S3UploadStorage {
    async fn presign_put(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError> {
        self.signing_bucket()
            .presign_put(key, expiry_secs, None, None)
            .await
            .map_err(|e| GatewayError::Storage(format!("署名付きアップロードURL生成失敗: {e}")))
    }

    async fn initiate_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartSession, GatewayError> {
        let response = self
            .bucket_internal
            .initiate_multipart_upload(key, content_type)
            .await
            .map_err(|e| GatewayError::Storage(format!("マルチパートアップロード開始失敗: {e}")))?;

        Ok(MultipartSession {
            upload_id: response.upload_id,
            key: response.key,
        })
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        self.signing_bucket()
            .presign_put(
                key,
                expiry_secs,
                None,
                Some(part_queries(upload_id, part_number)),
            )
            .await
            .map_err(|e| GatewayError::Storage(format!("パート用署名付きURL生成失敗: {e}")))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), GatewayError> {
        let parts: Vec<Part> = parts
            .iter()
            .map(|p| Part {
                part_number: p.part_number,
                etag: p.e_tag.clone(),
            })
            .collect();

        let response = self
            .bucket_internal
            .complete_multipart_upload(key, upload_id, parts)
            .await
            .map_err(|e| GatewayError::Storage(format!("マルチパートアップロード完了失敗: {e}")))?;

        // CompleteMultipartUploadは200でも本文に<Error>を返すことがある
        let status = response.status_code();
        let body = String::from_utf8_lossy(response.bytes());
        if !(200..300).contains(&status) || body.contains("<Error>") {
            return Err(GatewayError::Storage(format!(
                "マルチパートアップロード完了失敗: HTTP {status} - {body}"
            )));
        }

        Ok(())
    }
}
