//! # アプリケーション構築
//!
//! State を受け取り、ルーターとミドルウェアを組み立てる。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sendgate_shared::canonical_log::CanonicalLogLineLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handler::{
    ReadinessState,
    SendEmailsState,
    health_check,
    readiness_check,
    send_emails,
};

/// ルーターを構築する
///
/// ```text
/// CorsLayer → TraceLayer → CanonicalLogLineLayer → handler
/// ```
///
/// ブラウザのプリフライトは `CorsLayer` がすべて許可する。
/// サービスごとのオリジン制限は送信パイプライン内で判定する。
pub fn build_app(
    send_emails_state: Arc<SendEmailsState>,
    readiness_state: Arc<ReadinessState>,
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state)
        .route("/send-emails", post(send_emails))
        .with_state(send_emails_state)
        .layer(CanonicalLogLineLayer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
