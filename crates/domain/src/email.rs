//! # 送信メール
//!
//! テンプレート描画後、SMTP へ渡す直前のメッセージ表現。
//! 送信の実装（SMTP クライアント）は infra 層が持つ。

use thiserror::Error;

use crate::DispatchError;

/// 送信メール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// 差出人アドレス（サービスの SMTP ユーザー名）
    pub from_address: String,
    pub from_name:    Option<String>,
    pub to:           String,
    pub reply_to:     Option<String>,
    pub cc:           Vec<String>,
    pub bcc:          Vec<String>,
    pub subject:      String,
    pub html_body:    String,
}

/// メール送信の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailerError {
    /// アドレス・ヘッダーからメッセージを組み立てられない
    #[error("メッセージの組み立てに失敗しました: {0}")]
    InvalidMessage(String),

    /// SMTP サーバーとの通信・認証・受理に失敗した
    #[error("{0}")]
    Transport(String),
}

impl From<MailerError> for DispatchError {
    fn from(err: MailerError) -> Self {
        DispatchError::Smtp(err.to_string())
    }
}
