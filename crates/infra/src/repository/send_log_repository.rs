//! # SendLogRepository
//!
//! 宛先ごとの送信結果ログの永続化を担当するリポジトリ。
//! 成功・失敗どちらも記録し、記録後に更新することはない。

use async_trait::async_trait;
use sendgate_domain::audit::SendLog;
use sqlx::PgPool;

use crate::error::InfraError;

/// 送信ログリポジトリトレイト
#[async_trait]
pub trait SendLogRepository: Send + Sync {
    /// 送信ログを挿入する
    async fn insert(&self, log: &SendLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の SendLogRepository
#[derive(Debug, Clone)]
pub struct PostgresSendLogRepository {
    pool: PgPool,
}

impl PostgresSendLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SendLogRepository for PostgresSendLogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(status = %log.status))]
    async fn insert(&self, log: &SendLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO send_logs (id, user_id, service_id, template_id, status, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.user_id.as_uuid())
        .bind(&log.service_id)
        .bind(&log.template_id)
        .bind(log.status.as_ref())
        .bind(&log.message)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
