//! # 構造化ログのフィールド規約
//!
//! 送信結果の集計と障害調査のため、ログのフィールド名と値を定数として固定する。
//!
//! - 送信の成否や上限到達は [`log_business_event!`] で出力する
//!   （`jq 'select(.["event.kind"] == "business_event")'` で抽出できる）
//! - 記録系の失敗は `tracing::error!` に [`error`] の定数を `error.category` / `error.kind` として付ける
//!
//! フィールド名はドット区切りで、JSON 出力ではそのままフラットなキーになる。

/// `event.kind = "business_event"` を付けて INFO で出力する
///
/// 送信パイプラインでは `event.category` / `event.action` / `event.user_id` /
/// `event.result` を常に指定する。
///
/// ```
/// use sendgate_shared::{event_log::event, log_business_event};
///
/// log_business_event!(
///     event.category = event::category::DISPATCH,
///     event.action = event::action::BATCH_COMPLETED,
///     event.result = event::result::SUCCESS,
///     "バッチ送信完了"
/// );
/// ```
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const DISPATCH: &str = "dispatch";
        pub const RATE_LIMIT: &str = "rate_limit";
    }

    /// イベントアクション
    pub mod action {
        pub const EMAIL_SENT: &str = "email.sent";
        pub const EMAIL_FAILED: &str = "email.failed";
        pub const BATCH_COMPLETED: &str = "batch.completed";
        pub const QUOTA_EXHAUSTED: &str = "quota.exhausted";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const SEND_LOG: &str = "send_log";
        pub const PROFILE: &str = "profile";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（SMTP サーバー）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const QUOTA_RELEASE: &str = "quota_release";
        pub const AUDIT_LOG: &str = "audit_log";
        pub const EMAIL_HISTORY: &str = "email_history";
        pub const SMTP: &str = "smtp";
        pub const TASK_JOIN: &str = "task_join";
    }
}
