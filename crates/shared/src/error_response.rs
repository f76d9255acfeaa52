//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! HTTP 層で返すエラーレスポンスの構造体。
//!
//! 送信パイプライン内のエラー（宛先ごとの失敗）はこの型を使わず、
//! `200 OK` の集約レスポンスに文字列として埋め込まれる。
//! この型はリクエスト自体を処理できない場合（不正な JSON など）にのみ使う。

use serde::{Deserialize, Serialize};

/// error_type URI のベースパス
const ERROR_TYPE_BASE: &str = "https://sendgate.example.com/errors";

/// エラーレスポンス（RFC 9457 Problem Details）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    /// 汎用コンストラクタ
    ///
    /// `error_type_suffix` はベース URI に付加される（例: `"malformed-request"`）。
    pub fn new(
        error_type_suffix: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{error_type_suffix}"),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// 400 Malformed Request（リクエストボディが JSON として解釈できない）
    pub fn malformed_request(detail: impl Into<String>) -> Self {
        Self::new("malformed-request", "Malformed Request", 400, detail)
    }
}
