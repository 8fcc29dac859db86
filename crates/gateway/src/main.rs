//! # Upload Gateway
//!
//! ブラウザ・クライアントがストレージへ直接アップロードするための
//! 署名付きURLを発行するGateway。ファイル本体はGatewayを経由しない。
//!
//! ## API エンドポイント
//! - `GET /generate` — 単一オブジェクト用の署名付きURL発行
//! - `GET /multipart/initiate` — マルチパートアップロード開始
//! - `GET /multipart/presigned` — パート用の署名付きURL発行
//! - `POST /multipart/complete` — マルチパートアップロード完了

mod config;
mod endpoints;
mod error;
mod storage;

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, GatewayState, StorageSettings};
use crate::storage::UploadStorage;

// ---------------------------------------------------------------------------
// ルーター
// ---------------------------------------------------------------------------

/// CORSレイヤーを構築する。"*" を含む場合は全オリジンを許可する。
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

/// axumルーターを構築する。
pub(crate) fn build_router(state: Arc<GatewayState>) -> anyhow::Result<axum::Router> {
    let cors = cors_layer(&state.config.cors_allowed_origins)?;

    let app = axum::Router::new()
        .route("/generate", axum::routing::get(endpoints::handle_generate))
        .route(
            "/multipart/initiate",
            axum::routing::get(endpoints::handle_initiate_multipart),
        )
        .route(
            "/multipart/presigned",
            axum::routing::get(endpoints::handle_presign_part),
        )
        .route(
            "/multipart/complete",
            axum::routing::post(endpoints::handle_complete_multipart),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[cfg(feature = "vendor-aws")]
fn build_storage(settings: &StorageSettings) -> anyhow::Result<Box<dyn UploadStorage>> {
    Ok(Box::new(storage::S3UploadStorage::from_settings(settings)?))
}

#[cfg(not(feature = "vendor-aws"))]
fn build_storage(_settings: &StorageSettings) -> anyhow::Result<Box<dyn UploadStorage>> {
    anyhow::bail!("ストレージ実装が有効になっていません（feature \"vendor-aws\" を有効にしてください）")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    let storage = build_storage(&config.storage)?;

    tracing::info!(
        bucket = %config.storage.bucket_name,
        region = %config.storage.region,
        key_prefix = %config.key_prefix,
        presign_expiry_secs = config.presign_expiry_secs,
        validation_mode = ?config.validation_mode,
        "ストレージ設定を読み込みました"
    );

    let addr = config.bind_addr.clone();
    let state = Arc::new(GatewayState::new(config, storage));
    let app = build_router(state)?;

    tracing::info!("Gatewayを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
