//! # GET /multipart/presigned
//!
//! マルチパートアップロードの1パート分の署名付きURL発行。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use upload_types::{is_valid_part_number, PresignPartResponse};

use super::non_empty;
use crate::config::{GatewayState, ValidationMode};
use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignPartParams {
    pub filename: Option<String>,
    pub upload_id: Option<String>,
    /// 数値検証は検証モードに応じてハンドラで行う
    pub part_number: Option<String>,
}

/// partNumberを解釈する。
///
/// Strictでは1〜10000の整数以外を拒否する。
/// Lenientでは解釈できない値（非数値・負数・u32を超える値）を0として扱い、
/// 判断をストレージに委ねる。
pub(crate) fn parse_part_number(raw: &str, mode: ValidationMode) -> Result<u32, GatewayError> {
    match mode {
        ValidationMode::Strict => {
            let n: i64 = raw
                .trim()
                .parse()
                .map_err(|_| GatewayError::BadRequest(format!("Invalid partNumber: {raw}")))?;
            if !is_valid_part_number(n) {
                return Err(GatewayError::BadRequest(format!(
                    "partNumber out of range: {n}"
                )));
            }
            Ok(n as u32)
        }
        ValidationMode::Lenient => Ok(raw.trim().parse::<u32>().unwrap_or(0)),
    }
}

/// GET /multipart/presigned — パートアップロード用署名付きURL発行。
///
/// 有効期限は /generate と同じ。アップロードIDの有効性は検証しない。
pub async fn handle_presign_part(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<PresignPartParams>,
) -> Result<Json<PresignPartResponse>, GatewayError> {
    let (Some(filename), Some(upload_id), Some(part_number)) = (
        non_empty(params.filename),
        non_empty(params.upload_id),
        non_empty(params.part_number),
    ) else {
        return Err(GatewayError::missing("required parameters"));
    };

    let part_number = parse_part_number(&part_number, state.config.validation_mode)?;
    let key = state.object_key(&filename);

    let url = state
        .storage
        .presign_part(&key, &upload_id, part_number, state.config.presign_expiry_secs)
        .await
        .map_err(|e| state.storage_failure("presign_part", e))?;

    tracing::debug!(key = %key, upload_id = %upload_id, part_number, "パート用署名付きURLを発行");
    Ok(Json(PresignPartResponse { url }))
}
