//! # ヘルスチェックのレスポンス型
//!
//! - `/health`: プロセスが応答できるかだけを返す（[`HealthResponse`]）
//! - `/health/ready`: 依存先ごとの疎通結果をまとめて返す（[`ReadinessResponse`]）

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Liveness レスポンス（`{"status":"ok"}`）
///
/// ```
/// use sendgate_shared::HealthResponse;
///
/// assert_eq!(HealthResponse::ok().status, "ok");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// 依存先 1 つ分の疎通結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

impl CheckStatus {
    /// 疎通確認の結果から変換する（エラーの中身は呼び出し側でログに残す）
    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() { Self::Ok } else { Self::Error }
    }
}

/// 依存先すべてを見た全体の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

/// Readiness レスポンス
///
/// `checks` のキーは依存先の名前（`"database"` など）。
/// JSON 上のキー順を安定させるため `BTreeMap` で持つ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    pub checks: BTreeMap<String, CheckStatus>,
}

impl ReadinessResponse {
    /// `(依存先, 結果)` の並びから組み立てる。1 つでも `Error` なら `NotReady`
    pub fn from_checks<K: Into<String>>(checks: impl IntoIterator<Item = (K, CheckStatus)>) -> Self {
        let checks: BTreeMap<String, CheckStatus> =
            checks.into_iter().map(|(name, status)| (name.into(), status)).collect();
        let status = if checks.values().any(|c| *c == CheckStatus::Error) {
            ReadinessStatus::NotReady
        } else {
            ReadinessStatus::Ready
        };
        Self { status, checks }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}
