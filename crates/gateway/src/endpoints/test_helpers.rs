//! # エンドポイントテスト用共通ヘルパー
//!
//! ストレージに接続しないモック実装と、ルーターを実ポートで起動するヘルパー。

use std::sync::{Arc, Mutex};

use upload_types::CompletedPart;

use crate::config::{GatewayConfig, GatewayState, StorageSettings, ValidationMode};
use crate::error::GatewayError;
use crate::storage::{MultipartSession, UploadStorage};

/// モックに記録されたcomplete呼び出し。
#[derive(Debug, Clone)]
pub struct CompleteCall {
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<CompletedPart>,
}

/// テスト用のモックストレージ。
/// S3への接続なしで署名付きURLのダミーを返し、complete呼び出しを記録する。
#[derive(Default)]
pub struct MockStorage {
    /// Someの場合、全操作がこのメッセージのStorageエラーで失敗する
    pub fail_with: Option<String>,
    pub completed: Arc<Mutex<Vec<CompleteCall>>>,
}

impl MockStorage {
    fn check_failure(&self) -> Result<(), GatewayError> {
        match &self.fail_with {
            Some(msg) => Err(GatewayError::Storage(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl UploadStorage for MockStorage {
    async fn presign_put(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError> {
        self.check_failure()?;
        Ok(format!(
            "http://mock-storage/bucket/{key}?X-Amz-Expires={expiry_secs}&X-Amz-Signature=test"
        ))
    }

    async fn initiate_multipart(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<MultipartSession, GatewayError> {
        self.check_failure()?;
        Ok(MultipartSession {
            upload_id: "mock-upload-id".to_string(),
            key: key.to_string(),
        })
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        self.check_failure()?;
        Ok(format!(
            "http://mock-storage/bucket/{key}?partNumber={part_number}&uploadId={upload_id}\
             &X-Amz-Expires={expiry_secs}&X-Amz-Signature=test"
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), GatewayError> {
        self.check_failure()?;
        self.completed.lock().unwrap().push(CompleteCall {
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            parts: parts.to_vec(),
        });
        Ok(())
    }
}

/// テスト用GatewayConfigを構築するヘルパー
pub fn test_config(mode: ValidationMode) -> GatewayConfig {
    GatewayConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        key_prefix: "uploads/".to_string(),
        presign_expiry_secs: 900,
        validation_mode: mode,
        expose_backend_errors: true,
        cors_allowed_origins: vec!["*".to_string()],
        storage: StorageSettings {
            region: "us-east-1".to_string(),
            bucket_name: "bucket".to_string(),
            access_key: None,
            secret_key: None,
            endpoint: None,
            public_endpoint: None,
        },
    }
}

/// Gatewayを127.0.0.1の空きポートで起動し、ベースURLを返す。
pub async fn start_gateway(config: GatewayConfig, storage: MockStorage) -> String {
    let state = Arc::new(GatewayState::new(config, Box::new(storage)));
    let app = crate::build_router(state).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}
