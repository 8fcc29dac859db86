//! # GET /multipart/initiate
//!
//! マルチパートアップロードの開始。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use upload_types::InitiateMultipartResponse;

use super::non_empty;
use crate::config::GatewayState;
use crate::error::GatewayError;

/// Content-Type未指定時に使用する値
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateParams {
    pub key: Option<String>,
    /// `key` の別名
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// GET /multipart/initiate — マルチパートアップロード開始。
///
/// `key`（または `filename`）にプレフィックスを付けたキーでアップロードを作成し、
/// ストレージが発行した `uploadId` と `key` をそのまま返す。
pub async fn handle_initiate_multipart(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<InitiateParams>,
) -> Result<Json<InitiateMultipartResponse>, GatewayError> {
    let name = non_empty(params.key)
        .or_else(|| non_empty(params.filename))
        .ok_or_else(|| GatewayError::missing("key"))?;
    let key = state.object_key(&name);
    let content_type =
        non_empty(params.content_type).unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let session = state
        .storage
        .initiate_multipart(&key, &content_type)
        .await
        .map_err(|e| state.storage_failure("initiate_multipart", e))?;

    tracing::info!(
        key = %session.key,
        upload_id = %session.upload_id,
        "マルチパートアップロードを開始"
    );

    Ok(Json(InitiateMultipartResponse {
        upload_id: session.upload_id,
        key: session.key,
    }))
}
