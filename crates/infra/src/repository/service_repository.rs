//! # ServiceRepository
//!
//! SMTP 認証情報と CORS 許可リスト（サービス）の取得を担当するリポジトリ。
//! 読み取り専用。サービスの登録・更新は外部の管理画面が行う。

use async_trait::async_trait;
use sendgate_domain::{
    profile::UserId,
    service::{Service, ServiceId, SmtpEndpoint, SmtpSecret},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// サービスリポジトリトレイト
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// 所有者を指定してサービスを取得する
    ///
    /// 別ユーザーが所有するサービスは存在しないものとして `None` を返す。
    async fn find_by_id_and_user(
        &self,
        id: &ServiceId,
        user_id: &UserId,
    ) -> Result<Option<Service>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id:            Uuid,
    user_id:       Uuid,
    smtp_host:     String,
    smtp_port:     i32,
    smtp_email:    String,
    smtp_password: String,
    cors_origin:   Option<String>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = InfraError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let port = u16::try_from(row.smtp_port).map_err(|_| {
            InfraError::invalid_data(format!(
                "services.smtp_port が範囲外です: {} (service_id={})",
                row.smtp_port, row.id
            ))
        })?;

        Ok(Service {
            id:          ServiceId::from(row.id),
            user_id:     UserId::from(row.user_id),
            smtp:        SmtpEndpoint {
                host: row.smtp_host,
                port,
                email: row.smtp_email,
                password: SmtpSecret::new(row.smtp_password),
            },
            cors_origin: row.cors_origin,
        })
    }
}

/// PostgreSQL 実装の ServiceRepository
#[derive(Debug, Clone)]
pub struct PostgresServiceRepository {
    pool: PgPool,
}

impl PostgresServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PostgresServiceRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(service_id = %id))]
    async fn find_by_id_and_user(
        &self,
        id: &ServiceId,
        user_id: &UserId,
    ) -> Result<Option<Service>, InfraError> {
        let row: Option<ServiceRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, smtp_host, smtp_port, smtp_email, smtp_password, cors_origin
            FROM services
            WHERE id = $1
              AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Service::try_from).transpose()
    }
}
