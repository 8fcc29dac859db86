//! # Gatewayクライアント
//!
//! Gatewayから署名付きURLを取得し、ファイル本体をストレージへ直接PUTする。
//! マルチパートでは initiate → (presigned → PUT) × N → complete の順に呼び出す。

use std::path::Path;

use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use upload_types::{
    CompleteMultipartRequest, CompletedPart, InitiateMultipartResponse, PresignPartResponse,
    MAX_PART_NUMBER, MIN_PART_SIZE_BYTES,
};

/// デフォルトのパートサイズ（8 MiB）
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// クライアントエラー型。
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Gatewayがエラーを返した
    #[error("Gatewayがエラーを返しました: HTTP {status} - {body}")]
    Gateway { status: StatusCode, body: String },
    /// ストレージへのPUTが失敗した
    #[error("ストレージへのアップロードに失敗: HTTP {status} - {body}")]
    Storage { status: StatusCode, body: String },
    /// パートのPUTレスポンスにETagがない
    #[error("パート{0}のレスポンスにETagがありません")]
    MissingETag(u32),
    /// パートサイズ・パート数が制約を満たさない
    #[error("不正なパート構成: {0}")]
    InvalidPartLayout(String),
    /// HTTP通信失敗
    #[error("HTTP通信に失敗: {0}")]
    Http(#[from] reqwest::Error),
    /// ファイル読み込み失敗
    #[error("ファイル読み込みに失敗: {0}")]
    Io(#[from] std::io::Error),
}

/// ファイル内のパート範囲。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    pub part_number: u32,
    pub offset: u64,
    pub len: u64,
}

/// ファイルをパートに分割する。
///
/// 最終パート以外は `part_size` バイト。パート数は上限を超えてはならない。
pub fn plan_parts(file_size: u64, part_size: u64) -> Result<Vec<PartRange>, ClientError> {
    if part_size < MIN_PART_SIZE_BYTES {
        return Err(ClientError::InvalidPartLayout(format!(
            "パートサイズは{MIN_PART_SIZE_BYTES}バイト以上である必要があります: {part_size}"
        )));
    }
    if file_size == 0 {
        return Err(ClientError::InvalidPartLayout(
            "空ファイルはマルチパートでアップロードできません".to_string(),
        ));
    }

    let count = file_size.div_ceil(part_size);
    if count > MAX_PART_NUMBER as u64 {
        return Err(ClientError::InvalidPartLayout(format!(
            "パート数が上限({MAX_PART_NUMBER})を超えます: {count}"
        )));
    }

    Ok((0..count)
        .map(|i| {
            let offset = i * part_size;
            PartRange {
                part_number: i as u32 + 1,
                offset,
                len: part_size.min(file_size - offset),
            }
        })
        .collect())
}

/// Gateway APIクライアント。
pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 成功ステータス以外をGatewayエラーに変換する。
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Gateway { status, body })
    }

    /// GET /generate
    pub async fn generate(&self, filename: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.url("/generate"))
            .query(&[("filename", filename)])
            .send()
            .await?;
        Ok(Self::check(response).await?.text().await?)
    }

    /// GET /multipart/initiate
    pub async fn initiate(&self, name: &str) -> Result<InitiateMultipartResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/multipart/initiate"))
            .query(&[("key", name)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// GET /multipart/presigned
    pub async fn presign_part(
        &self,
        filename: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<String, ClientError> {
        let part_number = part_number.to_string();
        let response = self
            .http
            .get(self.url("/multipart/presigned"))
            .query(&[
                ("filename", filename),
                ("uploadId", upload_id),
                ("partNumber", part_number.as_str()),
            ])
            .send()
            .await?;
        let body: PresignPartResponse = Self::check(response).await?.json().await?;
        Ok(body.url)
    }

    /// POST /multipart/complete
    pub async fn complete(&self, request: &CompleteMultipartRequest) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/multipart/complete"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// 署名付きURLへボディをPUTし、ETagヘッダを返す。
    pub async fn put_signed(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<Option<String>, ClientError> {
        let response = self.http.put(url).body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Storage { status, body });
        }

        Ok(response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }
}

/// 署名付きURL1本でファイルをアップロードする。
pub async fn upload_single(
    client: &GatewayClient,
    path: &Path,
    name: &str,
) -> Result<(), ClientError> {
    let data = tokio::fs::read(path).await?;
    let url = client.generate(name).await?;
    tracing::debug!(url = %url, "署名付きURLを取得");

    client.put_signed(&url, data).await?;
    Ok(())
}

/// マルチパートでファイルをアップロードし、ストレージが発行したキーを返す。
///
/// パートは順番に1つずつ送信し、complete時はパート番号の昇順で送る。
/// 途中で失敗した場合、ストレージ側に未完了のアップロードが残る。
pub async fn upload_multipart(
    client: &GatewayClient,
    path: &Path,
    name: &str,
    part_size: u64,
) -> Result<String, ClientError> {
    let mut file = tokio::fs::File::open(path).await?;
    let file_size = file.metadata().await?.len();
    let plan = plan_parts(file_size, part_size)?;

    let session = client.initiate(name).await?;
    tracing::info!(
        key = %session.key,
        upload_id = %session.upload_id,
        parts = plan.len(),
        "マルチパートアップロードを開始"
    );

    let mut parts = Vec::with_capacity(plan.len());
    for range in &plan {
        let mut buf = vec![0u8; range.len as usize];
        file.seek(std::io::SeekFrom::Start(range.offset)).await?;
        file.read_exact(&mut buf).await?;

        let url = client
            .presign_part(name, &session.upload_id, range.part_number)
            .await?;
        let e_tag = client
            .put_signed(&url, buf)
            .await?
            .ok_or(ClientError::MissingETag(range.part_number))?;

        tracing::info!(part_number = range.part_number, bytes = range.len, "パートを送信");
        parts.push(CompletedPart {
            e_tag,
            part_number: range.part_number,
        });
    }

    client
        .complete(&CompleteMultipartRequest {
            key: session.key.clone(),
            upload_id: session.upload_id,
            parts,
        })
        .await?;

    Ok(session.key)
}
