//! # Upload Gateway 共有型定義
//!
//! Gatewayとクライアント（`upload-cli`、ブラウザ）の間でやり取りする
//! JSONボディをRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - フィールド名はcamelCase（`uploadId`, `partNumber`, `eTag`）
//! - ストレージキー・アップロードIDはストレージバックエンドが発行した文字列をそのまま扱う

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// マルチパートアップロードの制約
// ---------------------------------------------------------------------------

/// パート番号の最小値。
pub const MIN_PART_NUMBER: u32 = 1;

/// パート番号の最大値（S3互換ストレージの上限）。
pub const MAX_PART_NUMBER: u32 = 10_000;

/// 最終パート以外のパートの最小サイズ（5 MiB）。
pub const MIN_PART_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// パート番号がストレージの許容範囲内かを判定する。
pub fn is_valid_part_number(part_number: i64) -> bool {
    (MIN_PART_NUMBER as i64..=MAX_PART_NUMBER as i64).contains(&part_number)
}

// ---------------------------------------------------------------------------
// GET /multipart/initiate
// ---------------------------------------------------------------------------

/// /multipart/initiate レスポンス。
/// どちらの値もストレージバックエンドが発行したもの。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateMultipartResponse {
    /// マルチパートアップロードID
    pub upload_id: String,
    /// 作成されたオブジェクトキー（プレフィックス込み）
    pub key: String,
}

// ---------------------------------------------------------------------------
// GET /multipart/presigned
// ---------------------------------------------------------------------------

/// /multipart/presigned レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignPartResponse {
    /// パートアップロード用の署名付きURL（PUT）
    pub url: String,
}

// ---------------------------------------------------------------------------
// POST /multipart/complete
// ---------------------------------------------------------------------------

/// アップロード済みパートの記述子。
/// `eTag` は各パートのPUTレスポンスで返されたETagヘッダ値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// パートのETag
    #[serde(rename = "eTag")]
    pub e_tag: String,
    /// パート番号（1始まり）
    #[serde(rename = "partNumber")]
    pub part_number: u32,
}

/// /multipart/complete リクエスト。
///
/// `parts` はクライアントが指定した順序のままストレージに渡される。
/// 並び替えや連番チェックは行わない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartRequest {
    /// /multipart/initiate で返されたオブジェクトキー
    pub key: String,
    /// /multipart/initiate で返されたアップロードID
    pub upload_id: String,
    /// アップロード済みパート一覧
    pub parts: Vec<CompletedPart>,
}

/// /multipart/complete 成功時のレスポンスボディ。
pub const UPLOAD_COMPLETED: &str = "Upload completed";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_request_wire_format() {
        let body = serde_json::json!({
            "key": "uploads/video.mp4",
            "uploadId": "abc123",
            "parts": [
                {"eTag": "\"etag-2\"", "partNumber": 2},
                {"eTag": "\"etag-1\"", "partNumber": 1}
            ]
        });

        let req: CompleteMultipartRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.key, "uploads/video.mp4");
        assert_eq!(req.upload_id, "abc123");
        // クライアント指定の順序が保たれる
        assert_eq!(req.parts[0].part_number, 2);
        assert_eq!(req.parts[1].e_tag, "\"etag-1\"");
    }

    #[test]
    fn test_complete_request_missing_parts_rejected() {
        let body = serde_json::json!({"key": "uploads/a", "uploadId": "x"});
        assert!(serde_json::from_value::<CompleteMultipartRequest>(body).is_err());
    }

    #[test]
    fn test_negative_part_number_rejected() {
        let body = serde_json::json!({
            "key": "uploads/a",
            "uploadId": "x",
            "parts": [{"eTag": "e", "partNumber": -1}]
        });
        assert!(serde_json::from_value::<CompleteMultipartRequest>(body).is_err());
    }

    #[test]
    fn test_initiate_response_field_names() {
        let resp = InitiateMultipartResponse {
            upload_id: "id-1".to_string(),
            key: "uploads/file.bin".to_string(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["uploadId"], "id-1");
        assert_eq!(value["key"], "uploads/file.bin");
    }

    #[test]
    fn test_part_number_bounds() {
        assert!(!is_valid_part_number(0));
        assert!(is_valid_part_number(1));
        assert!(is_valid_part_number(10_000));
        assert!(!is_valid_part_number(10_001));
        assert!(!is_valid_part_number(-3));
    }
}
