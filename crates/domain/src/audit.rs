//! # 送信記録
//!
//! 受信者ごとの送信結果ログ（[`SendLog`]）と、
//! `(user_id, email_address, template_id)` 単位で重複しない送信履歴（[`EmailHistoryEntry`]）。
//!
//! どちらもベストエフォートで書き込まれ、書き込みの失敗は送信結果に影響しない。

use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

use crate::{profile::UserId, service::ServiceId, template::TemplateId};

define_uuid_id! {
    /// 送信ログ ID
    pub struct SendLogId;
}

define_uuid_id! {
    /// 送信履歴 ID
    pub struct EmailHistoryId;
}

/// 送信結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SendStatus {
    Success,
    Failed,
}

/// 送信ログ
///
/// `service_id` / `template_id` はリクエストで渡された文字列をそのまま記録する。
/// UUID として解釈できない値で失敗した試行も追跡できるようにするため。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendLog {
    pub id:          SendLogId,
    pub user_id:     UserId,
    pub service_id:  String,
    pub template_id: String,
    pub status:      SendStatus,
    pub message:     String,
    pub created_at:  DateTime<Utc>,
}

impl SendLog {
    /// 送信成功のログを作成する
    pub fn success(
        user_id: UserId,
        service_id: impl Into<String>,
        template_id: impl Into<String>,
        email_address: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SendLogId::new(),
            user_id,
            service_id: service_id.into(),
            template_id: template_id.into(),
            status: SendStatus::Success,
            message: format!("Email sent to {email_address}"),
            created_at: now,
        }
    }

    /// 送信失敗のログを作成する
    pub fn failure(
        user_id: UserId,
        service_id: impl Into<String>,
        template_id: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SendLogId::new(),
            user_id,
            service_id: service_id.into(),
            template_id: template_id.into(),
            status: SendStatus::Failed,
            message: message.into(),
            created_at: now,
        }
    }
}

/// 送信履歴
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailHistoryEntry {
    pub id:            EmailHistoryId,
    pub user_id:       UserId,
    pub service_id:    ServiceId,
    pub template_id:   TemplateId,
    pub email_address: String,
    pub name:          Option<String>,
    pub created_at:    DateTime<Utc>,
}
