//! # TemplateRepository
//!
//! メールテンプレートの取得を担当するリポジトリ。読み取り専用。

use async_trait::async_trait;
use sendgate_domain::{
    profile::UserId,
    template::{EmailTemplate, TemplateId},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// テンプレートリポジトリトレイト
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// 所有者を指定してテンプレートを取得する
    async fn find_by_id_and_user(
        &self,
        id: &TemplateId,
        user_id: &UserId,
    ) -> Result<Option<EmailTemplate>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id:          Uuid,
    user_id:     Uuid,
    subject:     String,
    content:     String,
    from_name:   Option<String>,
    reply_to:    Option<String>,
    cc:          Option<String>,
    bcc:         Option<String>,
    to_override: Option<String>,
}

impl From<TemplateRow> for EmailTemplate {
    fn from(row: TemplateRow) -> Self {
        EmailTemplate {
            id:          TemplateId::from(row.id),
            user_id:     UserId::from(row.user_id),
            subject:     row.subject,
            content:     row.content,
            from_name:   row.from_name,
            reply_to:    row.reply_to,
            cc:          row.cc,
            bcc:         row.bcc,
            to_override: row.to_override,
        }
    }
}

/// PostgreSQL 実装の TemplateRepository
#[derive(Debug, Clone)]
pub struct PostgresTemplateRepository {
    pool: PgPool,
}

impl PostgresTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(template_id = %id))]
    async fn find_by_id_and_user(
        &self,
        id: &TemplateId,
        user_id: &UserId,
    ) -> Result<Option<EmailTemplate>, InfraError> {
        let row: Option<TemplateRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, subject, content, from_name, reply_to, cc, bcc, to_override
            FROM templates
            WHERE id = $1
              AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(EmailTemplate::from))
    }
}
