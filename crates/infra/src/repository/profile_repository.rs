//! # ProfileRepository
//!
//! ユーザーキーの解決と送信上限の確保・返却を担当するリポジトリ。
//!
//! ## 送信上限の扱い
//!
//! 「残数の確認」と「減算」を 1 回の条件付き UPDATE で行う。
//! 同一ユーザーの宛先を並行処理しても残数が負になったり、
//! 上限を超えて送信したりすることはない。
//!
//! 確保した 1 件分は、送信が失敗した場合に [`ProfileRepository::release_quota`] で返却する。

use async_trait::async_trait;
use sendgate_domain::profile::{QuotaReservation, UserId, UserKey};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// プロファイルリポジトリトレイト
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// ユーザーキーからユーザー ID を解決する
    async fn find_user_id_by_key(&self, user_key: &UserKey) -> Result<Option<UserId>, InfraError>;

    /// 送信上限を 1 件分確保する
    ///
    /// 残数が 0 以下なら何も変更せず [`QuotaReservation::Exhausted`] を返す。
    async fn try_reserve_quota(&self, user_id: &UserId) -> Result<QuotaReservation, InfraError>;

    /// 確保済みの 1 件分を返却する
    async fn release_quota(&self, user_id: &UserId) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の ProfileRepository
#[derive(Debug, Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_user_id_by_key(&self, user_key: &UserKey) -> Result<Option<UserId>, InfraError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM profiles
            WHERE user_key = $1
            "#,
        )
        .bind(user_key.expose())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id,)| UserId::from(user_id)))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn try_reserve_quota(&self, user_id: &UserId) -> Result<QuotaReservation, InfraError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE profiles
            SET rate_limit = rate_limit - 1,
                updated_at = now()
            WHERE user_id = $1
              AND rate_limit > 0
            RETURNING rate_limit
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((remaining,)) => QuotaReservation::Granted { remaining },
            None => QuotaReservation::Exhausted,
        })
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn release_quota(&self, user_id: &UserId) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET rate_limit = rate_limit + 1,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
