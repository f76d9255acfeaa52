//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `{"status":"ok"}` を返す）
//! - `/health/ready`: Readiness Check（DB の接続状態を確認）
//!
//! レスポンス型は [`sendgate_shared::HealthResponse`] / [`sendgate_shared::ReadinessResponse`] を参照。

use std::{sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sendgate_infra::db;
use sendgate_shared::{CheckStatus, HealthResponse, ReadinessResponse};
use sqlx::PgPool;

/// DB 疎通確認のタイムアウト
const DATABASE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness Check エンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Readiness Check 用の State
pub struct ReadinessState {
    pub pool: PgPool,
}

/// Readiness Check エンドポイント
///
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let database = check_database(&state.pool).await;
    let response =
        ReadinessResponse::from_checks([("database", CheckStatus::from_result(&database))]);

    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn check_database(pool: &PgPool) -> Result<(), ()> {
    match tokio::time::timeout(DATABASE_CHECK_TIMEOUT, db::ping(pool)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.is_pool_timeout() => {
            tracing::warn!("readiness check: DB 接続を取得できません");
            Err(())
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness check: DB への疎通に失敗");
            Err(())
        }
        Err(_) => {
            tracing::warn!("readiness check: DB の疎通確認がタイムアウト");
            Err(())
        }
    }
}
