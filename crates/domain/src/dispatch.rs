//! # 送信リクエスト
//!
//! 1 回の `POST /send-emails` を表す値と、宛先ごと・バッチ全体の結果。
//!
//! リクエストの文脈（ユーザーキー、オリジン、パラメータ）はグローバル状態を持たず、
//! この型を各ステージへ明示的に渡す。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profile::UserKey;

/// 宛先
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Recipient {
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub name:          Option<String>,
}

impl Recipient {
    pub fn new(email_address: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            email_address: email_address.into(),
            name:          name.map(ToString::to_string),
        }
    }
}

/// 送信リクエスト
///
/// `service_id` / `template_id` は受け取った文字列のまま保持する。
/// UUID への変換はパイプライン内で行い、失敗は宛先単位のエラーになる。
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub user_key:    UserKey,
    pub service_id:  String,
    pub template_id: String,
    pub recipients:  Vec<Recipient>,
    pub parameters:  Map<String, Value>,
    /// `Origin` ヘッダーの値
    pub origin:      Option<String>,
}

/// 宛先 1 件分の最終状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// バッチ全体の結果
///
/// すべての宛先が送信済みなら `success = true` で `errors` は出力しない。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors:  Vec<String>,
}

impl BatchResult {
    /// 完了順に並んだ宛先ごとの結果から集約する
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = DispatchOutcome>) -> Self {
        let errors: Vec<String> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                DispatchOutcome::Sent => None,
                DispatchOutcome::Failed(message) => Some(message),
            })
            .collect();

        Self {
            success: errors.is_empty(),
            errors,
        }
    }
}
