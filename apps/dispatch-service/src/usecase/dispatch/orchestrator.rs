//! # 送信オーケストレーター
//!
//! 宛先 1 件分の送信パイプラインを実行する。
//!
//! ```text
//! ユーザーキー解決 → 送信上限の確保 → サービス取得 → オリジン検証
//!   → テンプレート取得 → 描画 → SMTP 送信 → 送信ログ → 送信履歴
//! ```
//!
//! ## エラーの扱い
//!
//! - どのステップの失敗も [`DispatchOutcome::Failed`] に変換し、呼び出し元へは返さない
//! - 確保した送信上限は、確保後のステップが失敗した時点で返却する
//! - 送信ログ・送信履歴・上限返却の失敗はログに残すのみで、送信結果を変えない
//! - ユーザーキーを解決できなかった場合は記録先のユーザーがいないため送信ログを書かない

use std::sync::Arc;

use chrono::{DateTime, Utc};

use sendgate_domain::{
    DispatchError,
    audit::{EmailHistoryEntry, EmailHistoryId, SendLog},
    clock::Clock,
    dispatch::{DispatchOutcome, DispatchRequest, Recipient},
    email::OutgoingEmail,
    origin::validate_origin,
    profile::{QuotaReservation, UserId},
    service::ServiceId,
    template::TemplateId,
};
use sendgate_infra::{
    InfraError,
    Mailer,
    repository::{
        EmailHistoryRepository,
        ProfileRepository,
        SendLogRepository,
        ServiceRepository,
        TemplateRepository,
    },
};
use sendgate_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::TemplateRenderer;

/// オーケストレーターが依存するコンポーネント
#[derive(Clone)]
pub struct DispatchDeps {
    pub profiles:  Arc<dyn ProfileRepository>,
    pub services:  Arc<dyn ServiceRepository>,
    pub templates: Arc<dyn TemplateRepository>,
    pub send_logs: Arc<dyn SendLogRepository>,
    pub history:   Arc<dyn EmailHistoryRepository>,
    pub mailer:    Arc<dyn Mailer>,
    pub clock:     Arc<dyn Clock>,
}

/// 送信に成功した宛先の識別子（送信履歴の記録に使う）
struct Delivery {
    service_id:  ServiceId,
    template_id: TemplateId,
}

/// 送信オーケストレーター
pub struct DispatchOrchestrator {
    deps:     DispatchDeps,
    renderer: TemplateRenderer,
}

impl DispatchOrchestrator {
    pub fn new(deps: DispatchDeps) -> Self {
        Self {
            deps,
            renderer: TemplateRenderer::new(),
        }
    }

    /// 宛先 1 件分のパイプラインを実行する
    #[tracing::instrument(skip_all, fields(recipient = %recipient.email_address))]
    pub async fn dispatch_one(
        &self,
        request: &DispatchRequest,
        recipient: &Recipient,
    ) -> DispatchOutcome {
        let user_id = match self.resolve_user(request).await {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::info!(error = %err, "ユーザーキーを解決できないため送信を中止");
                return DispatchOutcome::Failed(failure_message(recipient, &err));
            }
        };

        let result = self.run_pipeline(&user_id, request, recipient).await;
        let now = self.deps.clock.now();

        match result {
            Ok(delivery) => {
                log_business_event!(
                    event.category = event::category::DISPATCH,
                    event.action = event::action::EMAIL_SENT,
                    event.user_id = %user_id,
                    event.entity_type = event::entity_type::SEND_LOG,
                    event.result = event::result::SUCCESS,
                    dispatch.service_id = %delivery.service_id,
                    dispatch.template_id = %delivery.template_id,
                    "メール送信成功"
                );
                self.record_log(SendLog::success(
                    user_id.clone(),
                    request.service_id.as_str(),
                    request.template_id.as_str(),
                    &recipient.email_address,
                    now,
                ))
                .await;
                self.record_history(&user_id, &delivery, recipient, now).await;
                DispatchOutcome::Sent
            }
            Err(err) => {
                log_business_event!(
                    event.category = event::category::DISPATCH,
                    event.action = event::action::EMAIL_FAILED,
                    event.user_id = %user_id,
                    event.entity_type = event::entity_type::SEND_LOG,
                    event.result = event::result::FAILURE,
                    event.reason = err.kind(),
                    error = %err,
                    "メール送信失敗"
                );
                self.record_log(SendLog::failure(
                    user_id,
                    request.service_id.as_str(),
                    request.template_id.as_str(),
                    err.to_string(),
                    now,
                ))
                .await;
                DispatchOutcome::Failed(failure_message(recipient, &err))
            }
        }
    }

    async fn resolve_user(&self, request: &DispatchRequest) -> Result<UserId, DispatchError> {
        self.deps
            .profiles
            .find_user_id_by_key(&request.user_key)
            .await
            .map_err(|e| DispatchError::InvalidUserKey(backend(e).to_string()))?
            .ok_or_else(|| DispatchError::InvalidUserKey("該当するユーザーが存在しません".into()))
    }

    /// 送信上限を確保してから送信し、失敗した場合は確保分を返却する
    async fn run_pipeline(
        &self,
        user_id: &UserId,
        request: &DispatchRequest,
        recipient: &Recipient,
    ) -> Result<Delivery, DispatchError> {
        self.reserve_quota(user_id).await?;

        match self.deliver(user_id, request, recipient).await {
            Ok(delivery) => Ok(delivery),
            Err(err) => {
                self.release_quota(user_id).await;
                Err(err)
            }
        }
    }

    async fn reserve_quota(&self, user_id: &UserId) -> Result<(), DispatchError> {
        match self
            .deps
            .profiles
            .try_reserve_quota(user_id)
            .await
            .map_err(backend)?
        {
            QuotaReservation::Granted { remaining } => {
                tracing::debug!(remaining, "送信上限を確保");
                Ok(())
            }
            QuotaReservation::Exhausted => {
                log_business_event!(
                    event.category = event::category::RATE_LIMIT,
                    event.action = event::action::QUOTA_EXHAUSTED,
                    event.user_id = %user_id,
                    event.entity_type = event::entity_type::PROFILE,
                    event.result = event::result::FAILURE,
                    "送信上限に到達"
                );
                Err(DispatchError::RateLimitExceeded)
            }
        }
    }

    async fn release_quota(&self, user_id: &UserId) {
        if let Err(e) = self.deps.profiles.release_quota(user_id).await {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::QUOTA_RELEASE,
                "送信上限の返却に失敗: {}",
                e
            );
        }
    }

    /// サービス取得から SMTP 送信まで
    async fn deliver(
        &self,
        user_id: &UserId,
        request: &DispatchRequest,
        recipient: &Recipient,
    ) -> Result<Delivery, DispatchError> {
        let service_id =
            ServiceId::parse(&request.service_id).ok_or(DispatchError::InvalidService)?;
        let service = self
            .deps
            .services
            .find_by_id_and_user(&service_id, user_id)
            .await
            .map_err(backend)?
            .ok_or(DispatchError::InvalidService)?;

        validate_origin(service.allow_list(), request.origin.as_deref())?;

        let template_id =
            TemplateId::parse(&request.template_id).ok_or(DispatchError::InvalidTemplate)?;
        let template = self
            .deps
            .templates
            .find_by_id_and_user(&template_id, user_id)
            .await
            .map_err(backend)?
            .ok_or(DispatchError::InvalidTemplate)?;

        let rendered = self
            .renderer
            .render(&template, recipient, &request.parameters)?;

        let email = OutgoingEmail {
            from_address: service.sender_address().to_string(),
            from_name:    template.display_name().map(ToString::to_string),
            to:           template.resolve_to(&recipient.email_address).to_string(),
            reply_to:     template.reply_to_address().map(ToString::to_string),
            cc:           template.cc_addresses(),
            bcc:          template.bcc_addresses(),
            subject:      rendered.subject,
            html_body:    rendered.html_body,
        };
        if let Err(e) = self.deps.mailer.send(&service.smtp, &email).await {
            tracing::warn!(
                error.category = log_error::category::EXTERNAL_SERVICE,
                error.kind = log_error::kind::SMTP,
                smtp.host = %service.smtp.host,
                "SMTP 送信に失敗: {}",
                e
            );
            return Err(e.into());
        }

        Ok(Delivery {
            service_id,
            template_id,
        })
    }

    async fn record_log(&self, log: SendLog) {
        if let Err(e) = self.deps.send_logs.insert(&log).await {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::AUDIT_LOG,
                "送信ログの記録に失敗: {}",
                e
            );
        }
    }

    async fn record_history(
        &self,
        user_id: &UserId,
        delivery: &Delivery,
        recipient: &Recipient,
        now: DateTime<Utc>,
    ) {
        match self
            .insert_history_if_absent(user_id, delivery, recipient, now)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!("送信履歴が既にあるため記録しない"),
            Err(e) => tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::EMAIL_HISTORY,
                "送信履歴の記録に失敗: {}",
                e
            ),
        }
    }

    /// 同じ宛先・テンプレートの履歴がなければ記録する
    ///
    /// 記録した場合は `true`、既存の履歴があった場合は `false` を返す。
    async fn insert_history_if_absent(
        &self,
        user_id: &UserId,
        delivery: &Delivery,
        recipient: &Recipient,
        now: DateTime<Utc>,
    ) -> Result<bool, InfraError> {
        let history = &self.deps.history;
        if history
            .exists(user_id, &recipient.email_address, &delivery.template_id)
            .await?
        {
            return Ok(false);
        }

        let entry = EmailHistoryEntry {
            id:            EmailHistoryId::new(),
            user_id:       user_id.clone(),
            service_id:    delivery.service_id.clone(),
            template_id:   delivery.template_id.clone(),
            email_address: recipient.email_address.clone(),
            name:          recipient.name.clone(),
            created_at:    now,
        };
        history.insert(&entry).await
    }
}

fn backend(err: InfraError) -> DispatchError {
    tracing::error!(
        error.category = log_error::category::INFRASTRUCTURE,
        error.kind = log_error::kind::DATABASE,
        "データストアへのアクセスに失敗: {:?}",
        err
    );
    DispatchError::Backend(err.to_string())
}

/// 集約レスポンスに載せるエラー文字列
fn failure_message(recipient: &Recipient, err: &DispatchError) -> String {
    format!("{} への送信に失敗しました: {err}", recipient.email_address)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sendgate_domain::audit::SendStatus;

    use super::*;
    use crate::test_utils::DispatchFixture;

    #[tokio::test]
    async fn test_送信成功で上限が1減り成功ログと履歴が1件ずつ残る() {
        let fx = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", Some("Alice"));

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(4));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Success);
        assert_eq!(logs[0].message, "Email sent to alice@example.com");
        assert_eq!(logs[0].created_at, DispatchFixture::now());
        let history = fx.history.entries();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].email_address, "alice@example.com");
        assert_eq!(history[0].name.as_deref(), Some("Alice"));
        assert_eq!(history[0].template_id, fx.template.id);
    }

    #[tokio::test]
    async fn test_同じ宛先に2回送っても履歴は1件() {
        let fx = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);
        let request = fx.request(vec![]);

        assert!(sut.dispatch_one(&request, &recipient).await.is_sent());
        assert!(sut.dispatch_one(&request, &recipient).await.is_sent());

        assert_eq!(fx.mailer.sent().len(), 2);
        assert_eq!(fx.send_logs.logs().len(), 2);
        assert_eq!(fx.history.entries().len(), 1);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(3));
    }

    #[tokio::test]
    async fn test_上限が0ならsmtpを試行せずrate_limit_exceeded() {
        let fx = DispatchFixture::new(0);
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed(failure_message(
                &recipient,
                &DispatchError::RateLimitExceeded
            ))
        );
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(0));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Failed);
    }

    #[tokio::test]
    async fn test_smtp失敗で上限は減らず失敗ログのみ残る() {
        let fx = DispatchFixture::new(5);
        fx.mailer.fail_all();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("alice@example.com"), "{message}");
        assert!(message.contains("SMTP"), "{message}");
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Failed);
        assert!(fx.history.entries().is_empty());
    }

    #[tokio::test]
    async fn test_未知のユーザーキーは送信ログを残さない() {
        let fx = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.user_key = sendgate_domain::profile::UserKey::new("unknown");
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&request, &recipient).await;

        assert!(!outcome.is_sent());
        assert!(fx.send_logs.logs().is_empty());
        assert_eq!(fx.mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn test_別ユーザーのサービスはinvalid_service() {
        let fx = DispatchFixture::new(5);
        let other = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.service_id = other.service.id.to_string();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&request, &recipient).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed(failure_message(&recipient, &DispatchError::InvalidService))
        );
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
    }

    #[tokio::test]
    async fn test_uuidでないテンプレートidはinvalid_templateで生の値がログに残る() {
        let fx = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.template_id = "welcome".to_string();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&request, &recipient).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed(failure_message(&recipient, &DispatchError::InvalidTemplate))
        );
        assert_eq!(fx.send_logs.logs()[0].template_id, "welcome");
    }

    #[tokio::test]
    async fn test_許可されていないオリジンは送信しない() {
        let fx = DispatchFixture::with_cors_origin(5, Some("https://example.com"));
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.origin = Some("https://example.com.evil.com".to_string());
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&request, &recipient).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed(failure_message(
                &recipient,
                &DispatchError::OriginNotAllowed("https://example.com.evil.com".to_string())
            ))
        );
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
    }

    #[tokio::test]
    async fn test_サブドメインのオリジンは送信する() {
        let fx = DispatchFixture::with_cors_origin(5, Some("https://example.com"));
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.origin = Some("https://app.example.com".to_string());

        let outcome = sut
            .dispatch_one(&request, &Recipient::new("alice@example.com", None))
            .await;

        assert_eq!(outcome, DispatchOutcome::Sent);
    }

    #[tokio::test]
    async fn test_テンプレートのヘッダー設定が送信メールに反映される() {
        let fx = DispatchFixture::new(5);
        let mut template = fx.template.clone();
        template.id = TemplateId::new();
        template.from_name = Some("Acme".to_string());
        template.reply_to = Some("support@acme.test".to_string());
        template.cc = Some("cc1@acme.test, cc2@acme.test".to_string());
        template.to_override = Some("qa@acme.test".to_string());
        fx.templates.add_template(template.clone());
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request.template_id = template.id.to_string();

        let outcome = sut
            .dispatch_one(&request, &Recipient::new("alice@example.com", None))
            .await;

        assert_eq!(outcome, DispatchOutcome::Sent);
        let sent = fx.mailer.sent();
        assert_eq!(sent[0].from_address, fx.service.smtp.email);
        assert_eq!(sent[0].from_name.as_deref(), Some("Acme"));
        assert_eq!(sent[0].to, "qa@acme.test");
        assert_eq!(sent[0].reply_to.as_deref(), Some("support@acme.test"));
        assert_eq!(sent[0].cc, vec!["cc1@acme.test", "cc2@acme.test"]);
        assert_eq!(fx.mailer.endpoints()[0], fx.service.smtp);
        assert_eq!(fx.history.entries()[0].email_address, "alice@example.com");
    }

    #[tokio::test]
    async fn test_送信ログの記録失敗は送信結果に影響しない() {
        let fx = DispatchFixture::new(5);
        fx.send_logs.fail_inserts();
        let sut = fx.orchestrator();

        let outcome = sut
            .dispatch_one(&fx.request(vec![]), &Recipient::new("alice@example.com", None))
            .await;

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(fx.history.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_上限返却の失敗は元のエラーを変えない() {
        let fx = DispatchFixture::new(5);
        fx.mailer.fail_all();
        fx.profiles.fail_releases();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("SMTP"), "{message}");
    }

    #[tokio::test]
    async fn test_ユーザーキー解決のdb障害はinvalid_user_keyで送信ログを残さない() {
        let fx = DispatchFixture::new(5);
        fx.profiles.fail_lookups();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("ユーザーキーが不正です"), "{message}");
        assert!(message.contains("データストアエラー"), "{message}");
        assert!(fx.send_logs.logs().is_empty());
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
    }

    #[tokio::test]
    async fn test_上限確保のdb障害はbackendエラーで失敗ログが残る() {
        let fx = DispatchFixture::new(5);
        fx.profiles.fail_reservations();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("データストアエラー"), "{message}");
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Failed);
    }

    #[tokio::test]
    async fn test_サービス取得のdb障害はbackendエラーで上限を返却する() {
        let fx = DispatchFixture::new(5);
        fx.services.fail_lookups();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("データストアエラー"), "{message}");
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Failed);
        assert!(logs[0].message.contains("データストアエラー"), "{}", logs[0].message);
    }

    #[tokio::test]
    async fn test_テンプレート取得のdb障害はbackendエラーで上限を返却する() {
        let fx = DispatchFixture::new(5);
        fx.templates.fail_lookups();
        let sut = fx.orchestrator();
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&fx.request(vec![]), &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("データストアエラー"), "{message}");
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
    }

    #[tokio::test]
    async fn test_履歴の記録失敗は送信結果に影響しない() {
        let fx = DispatchFixture::new(5);
        fx.history.fail_writes();
        let sut = fx.orchestrator();

        let outcome = sut
            .dispatch_one(&fx.request(vec![]), &Recipient::new("alice@example.com", None))
            .await;

        assert_eq!(outcome, DispatchOutcome::Sent);
        assert_eq!(fx.mailer.sent().len(), 1);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(4));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Success);
        assert!(fx.history.entries().is_empty());
    }

    #[tokio::test]
    async fn test_日付パラメータが不正ならsmtpを試行せず上限を返却する() {
        let fx = DispatchFixture::new(5);
        let sut = fx.orchestrator();
        let mut request = fx.request(vec![]);
        request
            .parameters
            .insert("date".to_string(), serde_json::json!("next tuesday"));
        let recipient = Recipient::new("alice@example.com", None);

        let outcome = sut.dispatch_one(&request, &recipient).await;

        let DispatchOutcome::Failed(message) = outcome else {
            panic!("送信は失敗すること");
        };
        assert!(message.contains("パラメータが不正です"), "{message}");
        assert_eq!(fx.mailer.attempts(), 0);
        assert_eq!(fx.profiles.rate_limit(&fx.user_id), Some(5));
        let logs = fx.send_logs.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SendStatus::Failed);
    }
}
