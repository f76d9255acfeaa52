//! # メール送信
//!
//! 描画済みの [`OutgoingEmail`] をサービスごとの SMTP サーバーへ送信する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: ユースケース層は [`Mailer`] にのみ依存する
//! - **サービスごとの接続**: 接続先・認証情報はサービスごとに異なるため、送信のたびに接続する
//! - **再送しない**: 1 回だけ試行し、失敗はそのまま [`MailerError`] として返す

mod header;
mod smtp;

use async_trait::async_trait;
pub use header::{XMailer, XPriority};
use sendgate_domain::{
    email::{MailerError, OutgoingEmail},
    service::SmtpEndpoint,
};
pub use smtp::{SmtpMailer, compose_message};

/// メール送信トレイト
#[async_trait]
pub trait Mailer: Send + Sync {
    /// 指定した SMTP サーバーでメールを送信する
    async fn send(&self, endpoint: &SmtpEndpoint, email: &OutgoingEmail)
    -> Result<(), MailerError>;
}
