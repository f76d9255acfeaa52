//! # Dispatch Service エラー定義
//!
//! HTTP 境界で発生するエラーと、RFC 9457 Problem Details レスポンスへの変換を定義する。
//!
//! 宛先ごとの送信エラー（[`sendgate_domain::DispatchError`]）はここを通らず、
//! 200 レスポンスの `errors` 配列に入る。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sendgate_shared::ErrorResponse;
use thiserror::Error;

/// Dispatch Service の HTTP 境界エラー
#[derive(Debug, Error)]
pub enum ServiceError {
    /// リクエストボディが JSON として解釈できない
    #[error("不正なリクエスト: {0}")]
    MalformedRequest(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServiceError::MalformedRequest(detail) => ErrorResponse::malformed_request(detail),
        };
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}
