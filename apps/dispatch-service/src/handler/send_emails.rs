//! # 一括送信ハンドラ
//!
//! ```text
//! POST /send-emails
//! ```
//!
//! リクエストボディを JSON として解釈できない場合のみ 400 を返す。
//! それ以外は宛先ごとの成否に関わらず 200 で、結果はボディに入る。
//!
//! ## レスポンス例
//!
//! ```json
//! { "success": false, "errors": ["b@example.com への送信に失敗しました: 送信上限に達しました"] }
//! ```

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use sendgate_domain::{
    dispatch::{BatchResult, DispatchRequest, Recipient},
    profile::UserKey,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{error::ServiceError, usecase::FanOutCoordinator};

/// 一括送信 API の State
pub struct SendEmailsState {
    pub coordinator: FanOutCoordinator,
}

/// 一括送信リクエスト
///
/// 欠けているフィールドは空値として扱い、パイプライン内で宛先ごとのエラーになる。
#[derive(Debug, Deserialize)]
pub struct SendEmailsRequest {
    #[serde(default)]
    pub user_key:    String,
    #[serde(default)]
    pub service_id:  String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub recipients:  Option<Vec<Recipient>>,
    #[serde(default)]
    pub parameters:  Option<Map<String, Value>>,
}

impl SendEmailsRequest {
    fn into_dispatch_request(self, origin: Option<String>) -> DispatchRequest {
        DispatchRequest {
            user_key: UserKey::new(self.user_key),
            service_id: self.service_id,
            template_id: self.template_id,
            recipients: self.recipients.unwrap_or_default(),
            parameters: self.parameters.unwrap_or_default(),
            origin,
        }
    }
}

/// 一括送信エンドポイント
///
/// ボディは `Json` 抽出器を使わずに受け取り、Content-Type に関わらず JSON として解釈する。
#[tracing::instrument(skip_all)]
pub async fn send_emails(
    State(state): State<Arc<SendEmailsState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchResult>, ServiceError> {
    let payload: SendEmailsRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::info!(error = %e, "リクエストボディを解釈できません");
        ServiceError::MalformedRequest(e.to_string())
    })?;

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let result = state
        .coordinator
        .run(payload.into_dispatch_request(origin))
        .await;

    Ok(Json(result))
}
