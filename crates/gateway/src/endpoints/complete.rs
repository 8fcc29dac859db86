//! # POST /multipart/complete
//!
//! マルチパートアップロードの完了。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use upload_types::{is_valid_part_number, CompleteMultipartRequest, UPLOAD_COMPLETED};

use crate::config::{GatewayState, ValidationMode};
use crate::error::GatewayError;

/// リクエストを検証する。
///
/// キーとアップロードIDは常に必須。Strictでは空のパート一覧、
/// 範囲外のパート番号、空のETagも拒否する。パートの順序と重複は検証しない。
pub(crate) fn validate_request(
    req: &CompleteMultipartRequest,
    mode: ValidationMode,
) -> Result<(), GatewayError> {
    if req.key.is_empty() {
        return Err(GatewayError::missing("key"));
    }
    if req.upload_id.is_empty() {
        return Err(GatewayError::missing("uploadId"));
    }

    if mode == ValidationMode::Lenient {
        return Ok(());
    }

    if req.parts.is_empty() {
        return Err(GatewayError::missing("parts"));
    }
    for part in &req.parts {
        if !is_valid_part_number(part.part_number as i64) {
            return Err(GatewayError::BadRequest(format!(
                "partNumber out of range: {}",
                part.part_number
            )));
        }
        if part.e_tag.is_empty() {
            return Err(GatewayError::BadRequest(format!(
                "Missing eTag for part {}",
                part.part_number
            )));
        }
    }

    Ok(())
}

/// POST /multipart/complete — マルチパートアップロード完了。
///
/// ボディはContent-Typeに関わらずJSONとして解釈する。
/// パートはクライアントが指定した順序のままストレージに渡す。
pub async fn handle_complete_multipart(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), GatewayError> {
    let req: CompleteMultipartRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "completeリクエストのパースに失敗");
        GatewayError::BadRequest("Invalid JSON".to_string())
    })?;

    validate_request(&req, state.config.validation_mode)?;

    state
        .storage
        .complete_multipart(&req.key, &req.upload_id, &req.parts)
        .await
        .map_err(|e| state.storage_failure("complete_multipart", e))?;

    tracing::info!(
        key = %req.key,
        upload_id = %req.upload_id,
        parts = req.parts.len(),
        "マルチパートアップロードを完了"
    );

    Ok((StatusCode::OK, UPLOAD_COMPLETED))
}
