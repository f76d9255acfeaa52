//! # EmailHistoryRepository
//!
//! 送信履歴の永続化を担当するリポジトリ。
//!
//! 履歴は `(user_id, email_address, template_id)` ごとに 1 行のみ。
//! 呼び出し側の存在確認に加えて UNIQUE 制約 + `ON CONFLICT DO NOTHING` で
//! 同時挿入でも重複しない。

use async_trait::async_trait;
use sendgate_domain::{audit::EmailHistoryEntry, profile::UserId, template::TemplateId};
use sqlx::PgPool;

use crate::error::InfraError;

/// 送信履歴リポジトリトレイト
#[async_trait]
pub trait EmailHistoryRepository: Send + Sync {
    /// 同じ宛先・テンプレートの履歴が既にあるか
    async fn exists(
        &self,
        user_id: &UserId,
        email_address: &str,
        template_id: &TemplateId,
    ) -> Result<bool, InfraError>;

    /// 履歴を挿入する。既存行と衝突した場合は何もせず `false` を返す
    async fn insert(&self, entry: &EmailHistoryEntry) -> Result<bool, InfraError>;
}

/// PostgreSQL 実装の EmailHistoryRepository
#[derive(Debug, Clone)]
pub struct PostgresEmailHistoryRepository {
    pool: PgPool,
}

impl PostgresEmailHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailHistoryRepository for PostgresEmailHistoryRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn exists(
        &self,
        user_id: &UserId,
        email_address: &str,
        template_id: &TemplateId,
    ) -> Result<bool, InfraError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM email_history
                WHERE user_id = $1
                  AND email_address = $2
                  AND template_id = $3
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(email_address)
        .bind(template_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn insert(&self, entry: &EmailHistoryEntry) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            INSERT INTO email_history (
                id, user_id, service_id, template_id, email_address, name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, email_address, template_id) DO NOTHING
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.service_id.as_uuid())
        .bind(entry.template_id.as_uuid())
        .bind(&entry.email_address)
        .bind(&entry.name)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
