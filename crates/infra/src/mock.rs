//! # テスト用モック
//!
//! ユースケーステスト・ハンドラテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! sendgate-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 各モックは `Clone` で内部状態（`Arc<Mutex<_>>`）を共有するため、
//! テストは State に渡したものの clone から呼び出し結果を検証できる。

use std::{
    collections::HashSet,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use sendgate_domain::{
    audit::{EmailHistoryEntry, SendLog},
    email::{MailerError, OutgoingEmail},
    profile::{Profile, QuotaReservation, UserId, UserKey},
    service::{Service, ServiceId, SmtpEndpoint},
    template::{EmailTemplate, TemplateId},
};

use crate::{
    error::InfraError,
    mailer::Mailer,
    repository::{
        EmailHistoryRepository,
        ProfileRepository,
        SendLogRepository,
        ServiceRepository,
        TemplateRepository,
    },
};

// ===== MockProfileRepository =====

#[derive(Clone, Default)]
pub struct MockProfileRepository {
    profiles:          Arc<Mutex<Vec<(String, Profile)>>>,
    lookup_count:      Arc<AtomicUsize>,
    fail_lookups:      Arc<Mutex<bool>>,
    fail_reservations: Arc<Mutex<bool>>,
    fail_releases:     Arc<Mutex<bool>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, user_key: &str, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .push((user_key.to_string(), profile));
    }

    /// 現在の送信上限
    pub fn rate_limit(&self, user_id: &UserId) -> Option<i32> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .find(|(_, p)| &p.user_id == user_id)
            .map(|(_, p)| p.rate_limit)
    }

    /// ユーザーキーの解決が呼ばれた回数
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// 以降のユーザーキー解決を失敗させる
    pub fn fail_lookups(&self) {
        *self.fail_lookups.lock().unwrap() = true;
    }

    /// 以降の送信上限の確保を失敗させる
    pub fn fail_reservations(&self) {
        *self.fail_reservations.lock().unwrap() = true;
    }

    /// 以降の返却処理を失敗させる
    pub fn fail_releases(&self) {
        *self.fail_releases.lock().unwrap() = true;
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_user_id_by_key(&self, user_key: &UserKey) -> Result<Option<UserId>, InfraError> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_lookups.lock().unwrap() {
            return Err(InfraError::unexpected("profiles lookup failed"));
        }
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key == user_key.expose())
            .map(|(_, p)| p.user_id.clone()))
    }

    async fn try_reserve_quota(&self, user_id: &UserId) -> Result<QuotaReservation, InfraError> {
        if *self.fail_reservations.lock().unwrap() {
            return Err(InfraError::unexpected("profiles update failed"));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let Some((_, profile)) = profiles.iter_mut().find(|(_, p)| &p.user_id == user_id) else {
            return Ok(QuotaReservation::Exhausted);
        };
        if !profile.has_quota() {
            return Ok(QuotaReservation::Exhausted);
        }
        profile.rate_limit -= 1;
        Ok(QuotaReservation::Granted {
            remaining: profile.rate_limit,
        })
    }

    async fn release_quota(&self, user_id: &UserId) -> Result<(), InfraError> {
        if *self.fail_releases.lock().unwrap() {
            return Err(InfraError::unexpected("release_quota failed"));
        }
        let mut profiles = self.profiles.lock().unwrap();
        if let Some((_, profile)) = profiles.iter_mut().find(|(_, p)| &p.user_id == user_id) {
            profile.rate_limit += 1;
        }
        Ok(())
    }
}

// ===== MockServiceRepository =====

#[derive(Clone, Default)]
pub struct MockServiceRepository {
    services:     Arc<Mutex<Vec<Service>>>,
    fail_lookups: Arc<Mutex<bool>>,
}

impl MockServiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service(&self, service: Service) {
        self.services.lock().unwrap().push(service);
    }

    /// 以降の取得を失敗させる
    pub fn fail_lookups(&self) {
        *self.fail_lookups.lock().unwrap() = true;
    }
}

#[async_trait]
impl ServiceRepository for MockServiceRepository {
    async fn find_by_id_and_user(
        &self,
        id: &ServiceId,
        user_id: &UserId,
    ) -> Result<Option<Service>, InfraError> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(InfraError::unexpected("services lookup failed"));
        }
        Ok(self
            .services
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == id && &s.user_id == user_id)
            .cloned())
    }
}

// ===== MockTemplateRepository =====

#[derive(Clone, Default)]
pub struct MockTemplateRepository {
    templates:    Arc<Mutex<Vec<EmailTemplate>>>,
    fail_lookups: Arc<Mutex<bool>>,
}

impl MockTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&self, template: EmailTemplate) {
        self.templates.lock().unwrap().push(template);
    }

    /// 以降の取得を失敗させる
    pub fn fail_lookups(&self) {
        *self.fail_lookups.lock().unwrap() = true;
    }
}

#[async_trait]
impl TemplateRepository for MockTemplateRepository {
    async fn find_by_id_and_user(
        &self,
        id: &TemplateId,
        user_id: &UserId,
    ) -> Result<Option<EmailTemplate>, InfraError> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(InfraError::unexpected("templates lookup failed"));
        }
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| &t.id == id && &t.user_id == user_id)
            .cloned())
    }
}

// ===== MockSendLogRepository =====

#[derive(Clone, Default)]
pub struct MockSendLogRepository {
    logs:         Arc<Mutex<Vec<SendLog>>>,
    fail_inserts: Arc<Mutex<bool>>,
}

impl MockSendLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録された送信ログ
    pub fn logs(&self) -> Vec<SendLog> {
        self.logs.lock().unwrap().clone()
    }

    /// 以降の挿入を失敗させる
    pub fn fail_inserts(&self) {
        *self.fail_inserts.lock().unwrap() = true;
    }
}

#[async_trait]
impl SendLogRepository for MockSendLogRepository {
    async fn insert(&self, log: &SendLog) -> Result<(), InfraError> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(InfraError::unexpected("send_logs insert failed"));
        }
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

// ===== MockEmailHistoryRepository =====

#[derive(Clone, Default)]
pub struct MockEmailHistoryRepository {
    entries:     Arc<Mutex<Vec<EmailHistoryEntry>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockEmailHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録された送信履歴
    pub fn entries(&self) -> Vec<EmailHistoryEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// 以降の存在確認と挿入を失敗させる
    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }
}

#[async_trait]
impl EmailHistoryRepository for MockEmailHistoryRepository {
    async fn exists(
        &self,
        user_id: &UserId,
        email_address: &str,
        template_id: &TemplateId,
    ) -> Result<bool, InfraError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(InfraError::unexpected("email_history lookup failed"));
        }
        Ok(self.entries.lock().unwrap().iter().any(|e| {
            &e.user_id == user_id
                && e.email_address == email_address
                && &e.template_id == template_id
        }))
    }

    async fn insert(&self, entry: &EmailHistoryEntry) -> Result<bool, InfraError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(InfraError::unexpected("email_history insert failed"));
        }
        let mut entries = self.entries.lock().unwrap();
        let duplicated = entries.iter().any(|e| {
            e.user_id == entry.user_id
                && e.email_address == entry.email_address
                && e.template_id == entry.template_id
        });
        if duplicated {
            return Ok(false);
        }
        entries.push(entry.clone());
        Ok(true)
    }
}

// ===== RecordingMailer =====

/// 送信内容を記録するだけのメーラー
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent:        Arc<Mutex<Vec<(SmtpEndpoint, OutgoingEmail)>>>,
    failing_to:  Arc<Mutex<HashSet<String>>>,
    fail_all:    Arc<Mutex<bool>>,
    attempt_cnt: Arc<AtomicUsize>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for(&self, to: &str) {
        self.failing_to.lock().unwrap().insert(to.to_string());
    }

    /// すべての送信を失敗させる
    pub fn fail_all(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    /// 送信に成功したメール
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, email)| email.clone())
            .collect()
    }

    /// 送信に使われた SMTP 接続先
    pub fn endpoints(&self) -> Vec<SmtpEndpoint> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    /// 失敗を含む送信試行の回数
    pub fn attempts(&self) -> usize {
        self.attempt_cnt.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        endpoint: &SmtpEndpoint,
        email: &OutgoingEmail,
    ) -> Result<(), MailerError> {
        self.attempt_cnt.fetch_add(1, Ordering::SeqCst);
        if *self.fail_all.lock().unwrap() || self.failing_to.lock().unwrap().contains(&email.to) {
            return Err(MailerError::Transport(format!(
                "550 mailbox unavailable: {}",
                email.to
            )));
        }
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.clone(), email.clone()));
        Ok(())
    }
}
