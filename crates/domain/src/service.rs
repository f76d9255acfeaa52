//! # サービス
//!
//! 1 ユーザーが所有する SMTP 認証情報と CORS 許可リストの組。
//!
//! サービスは `(service_id, user_id)` の組でのみ取得する。
//! 別ユーザーのサービスを参照することはできない。

use crate::profile::UserId;

define_uuid_id! {
    /// サービス ID
    pub struct ServiceId;
}

define_secret_string! {
    /// SMTP 認証パスワード
    pub struct SmtpSecret;
}

/// SMTP 接続先と認証情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpEndpoint {
    pub host:     String,
    pub port:     u16,
    /// 認証ユーザー名（送信元アドレスを兼ねる）
    pub email:    String,
    pub password: SmtpSecret,
}

/// サービス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id:          ServiceId,
    pub user_id:     UserId,
    pub smtp:        SmtpEndpoint,
    /// カンマ区切りの CORS 許可リスト（未設定は制限なし）
    pub cors_origin: Option<String>,
}

impl Service {
    /// CORS 許可リスト（未設定は空文字列として扱う）
    pub fn allow_list(&self) -> &str {
        self.cors_origin.as_deref().unwrap_or("")
    }

    /// 送信元アドレス
    pub fn sender_address(&self) -> &str {
        &self.smtp.email
    }
}
