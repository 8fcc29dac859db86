//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。レスポンスボディはプレーンテキスト。

use axum::http::StatusCode;

/// ストレージエラー詳細を隠す場合のレスポンスボディ。
pub const STORAGE_FAILURE_MESSAGE: &str = "Storage backend request failed";

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（パラメータ欠落、JSONパース失敗、不正な値）
    #[error("{0}")]
    BadRequest(String),
    /// ストレージ操作に失敗（署名、マルチパート作成・完了）
    #[error("{0}")]
    Storage(String),
}

impl GatewayError {
    /// 必須パラメータ欠落エラーを構築する。
    pub fn missing(param: &str) -> Self {
        GatewayError::BadRequest(format!("Missing {param}"))
    }

    /// ストレージエラーの詳細を汎用メッセージに置き換える。
    /// それ以外のエラーはそのまま返す。
    pub fn redact_storage(self) -> Self {
        match self {
            GatewayError::Storage(_) => GatewayError::Storage(STORAGE_FAILURE_MESSAGE.to_string()),
            other => other,
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
