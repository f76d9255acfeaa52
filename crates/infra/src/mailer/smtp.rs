//! SMTP 送信実装
//!
//! lettre の `AsyncSmtpTransport` でサービスの SMTP サーバーへ接続し、PLAIN 認証で送信する。
//!
//! - ポート 465: 接続直後から TLS（implicit TLS）
//! - それ以外: サーバーが対応していれば STARTTLS

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    message::{
        Body,
        Mailbox,
        SinglePart,
        header::{ContentTransferEncoding, ContentType},
    },
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
    },
};
use sendgate_domain::{
    email::{MailerError, OutgoingEmail},
    service::SmtpEndpoint,
};

use super::{
    Mailer,
    header::{XMailer, XPriority},
};

/// implicit TLS を使うポート
const SMTPS_PORT: u16 = 465;

/// lettre による SMTP 送信
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout:     Duration,
    mailer_name: String,
}

impl SmtpMailer {
    /// # 引数
    ///
    /// - `timeout`: SMTP サーバーとの 1 コマンドあたりのタイムアウト
    /// - `mailer_name`: `X-Mailer` ヘッダーの値
    pub fn new(timeout: Duration, mailer_name: impl Into<String>) -> Self {
        Self {
            timeout,
            mailer_name: mailer_name.into(),
        }
    }

    fn transport(
        &self,
        endpoint: &SmtpEndpoint,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let tls_parameters = TlsParameters::new(endpoint.host.clone())
            .map_err(|e| MailerError::Transport(format!("TLS 設定に失敗しました: {e}")))?;
        let tls = if endpoint.port == SMTPS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Opportunistic(tls_parameters)
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&endpoint.host)
            .port(endpoint.port)
            .tls(tls)
            .credentials(Credentials::new(
                endpoint.email.clone(),
                endpoint.password.expose().to_string(),
            ))
            .authentication(vec![Mechanism::Plain])
            .timeout(Some(self.timeout))
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip_all, level = "debug", fields(host = %endpoint.host, port = endpoint.port))]
    async fn send(
        &self,
        endpoint: &SmtpEndpoint,
        email: &OutgoingEmail,
    ) -> Result<(), MailerError> {
        let message = compose_message(email, &self.mailer_name)?;
        let transport = self.transport(endpoint)?;

        transport
            .send(message)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// 送信メールから MIME メッセージを組み立てる
///
/// 本文は `text/html; charset=utf-8`、8bit エンコーディング。
/// 8bit で表現できない本文（1 行が長すぎる等）は lettre が適切なエンコーディングを選ぶ。
pub fn compose_message(email: &OutgoingEmail, mailer_name: &str) -> Result<Message, MailerError> {
    let from = Mailbox::new(
        email.from_name.clone(),
        email
            .from_address
            .parse()
            .map_err(|e| invalid("送信元アドレス", &email.from_address, e))?,
    );
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| invalid("宛先アドレス", &email.to, e))?;

    let mut builder = Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(XPriority::NORMAL)
        .header(XMailer(mailer_name.to_string()));

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(
            reply_to
                .parse()
                .map_err(|e| invalid("返信先アドレス", reply_to, e))?,
        );
    }
    for cc in &email.cc {
        builder = builder.cc(cc.parse().map_err(|e| invalid("CC アドレス", cc, e))?);
    }
    for bcc in &email.bcc {
        builder = builder.bcc(bcc.parse().map_err(|e| invalid("BCC アドレス", bcc, e))?);
    }

    let body = Body::new_with_encoding(email.html_body.clone(), ContentTransferEncoding::EightBit)
        .unwrap_or_else(Body::new);

    builder
        .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(body))
        .map_err(|e| MailerError::InvalidMessage(e.to_string()))
}

fn invalid(label: &str, value: &str, err: impl std::fmt::Display) -> MailerError {
    MailerError::InvalidMessage(format!("{label}が不正です ({value}): {err}"))
}
