//! # メールテンプレート
//!
//! 件名と HTML 本文のテンプレート、および送信ヘッダーの上書き設定。
//! テンプレートは `(template_id, user_id)` の組でのみ取得する。

use crate::profile::UserId;

define_uuid_id! {
    /// テンプレート ID
    pub struct TemplateId;
}

/// メールテンプレート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub id:          TemplateId,
    pub user_id:     UserId,
    /// 件名テンプレート
    pub subject:     String,
    /// HTML 本文テンプレート
    pub content:     String,
    /// 差出人表示名
    pub from_name:   Option<String>,
    pub reply_to:    Option<String>,
    /// カンマ区切りの CC アドレス
    pub cc:          Option<String>,
    /// カンマ区切りの BCC アドレス
    pub bcc:         Option<String>,
    /// 設定されている場合、全宛先をこのアドレスへ差し替える
    pub to_override: Option<String>,
}

impl EmailTemplate {
    /// CC アドレスの一覧
    pub fn cc_addresses(&self) -> Vec<String> {
        split_addresses(self.cc.as_deref())
    }

    /// BCC アドレスの一覧
    pub fn bcc_addresses(&self) -> Vec<String> {
        split_addresses(self.bcc.as_deref())
    }

    /// 実際の宛先アドレスを決定する
    ///
    /// `to_override` が空でなければそちらを優先する。
    pub fn resolve_to<'a>(&'a self, recipient_address: &'a str) -> &'a str {
        match self.to_override.as_deref().map(str::trim) {
            Some(overridden) if !overridden.is_empty() => overridden,
            _ => recipient_address,
        }
    }

    /// 空白のみの値を除いた差出人表示名
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.from_name.as_deref())
    }

    /// 空白のみの値を除いた返信先
    pub fn reply_to_address(&self) -> Option<&str> {
        non_blank(self.reply_to.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn split_addresses(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(ToString::to_string)
        .collect()
}
