//! # GET /generate
//!
//! 単一オブジェクトアップロード用の署名付きURL発行。

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;

use super::non_empty;
use crate::config::GatewayState;
use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub filename: Option<String>,
}

/// GET /generate — 署名付きURL発行。
///
/// `<prefix><filename>` へのPUTを許可するURLをプレーンテキストで返す。
pub async fn handle_generate(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<GenerateParams>,
) -> Result<String, GatewayError> {
    let filename = non_empty(params.filename).ok_or_else(|| GatewayError::missing("filename"))?;
    let key = state.object_key(&filename);

    let url = state
        .storage
        .presign_put(&key, state.config.presign_expiry_secs)
        .await
        .map_err(|e| state.storage_failure("presign_put", e))?;

    tracing::debug!(key = %key, url = %url, "署名付きアップロードURLを発行");
    Ok(url)
}
