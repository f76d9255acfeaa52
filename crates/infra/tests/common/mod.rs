//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシード行の挿入ヘルパー。
//! サービス・テンプレートは `profiles(user_id)` への FK を持つため、
//! 先に [`seed_profile`] でプロファイルを作成する。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sendgate_domain::{
    profile::{UserId, UserKey},
    service::ServiceId,
    template::TemplateId,
};
use sqlx::PgPool;
use uuid::Uuid;

/// テストで使う固定時刻
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
}

/// プロファイルを作成し、ユーザー ID とユーザーキーを返す
pub async fn seed_profile(pool: &PgPool, rate_limit: i32) -> (UserId, UserKey) {
    let user_id = UserId::new();
    let user_key = format!("uk_test_{}", Uuid::now_v7().simple());
    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, user_key, rate_limit)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(user_id.as_uuid())
    .bind(&user_key)
    .bind(rate_limit)
    .execute(pool)
    .await
    .expect("プロファイル作成に失敗");

    (user_id, UserKey::new(user_key))
}

/// サービスを作成する
pub async fn seed_service(pool: &PgPool, user_id: &UserId, cors_origin: Option<&str>) -> ServiceId {
    let id = ServiceId::new();
    sqlx::query(
        r#"
        INSERT INTO services (id, user_id, smtp_host, smtp_port, smtp_email, smtp_password, cors_origin)
        VALUES ($1, $2, 'smtp.example.com', 587, 'noreply@example.com', 'secret', $3)
        "#,
    )
    .bind(id.as_uuid())
    .bind(user_id.as_uuid())
    .bind(cors_origin)
    .execute(pool)
    .await
    .expect("サービス作成に失敗");

    id
}

/// 任意項目をすべて埋めたテンプレートを作成する
pub async fn seed_template(pool: &PgPool, user_id: &UserId) -> TemplateId {
    let id = TemplateId::new();
    sqlx::query(
        r#"
        INSERT INTO templates (id, user_id, subject, content, from_name, reply_to, cc, bcc, to_override)
        VALUES ($1, $2, 'Welcome {{ recipient.name }}', '<p>Hello</p>', 'Acme', 'support@acme.test',
                'cc1@acme.test, cc2@acme.test', NULL, NULL)
        "#,
    )
    .bind(id.as_uuid())
    .bind(user_id.as_uuid())
    .execute(pool)
    .await
    .expect("テンプレート作成に失敗");

    id
}

/// プロファイルの残り送信可能数を取得する
pub async fn rate_limit_of(pool: &PgPool, user_id: &UserId) -> i32 {
    let (rate_limit,): (i32,) = sqlx::query_as("SELECT rate_limit FROM profiles WHERE user_id = $1")
        .bind(user_id.as_uuid())
        .fetch_one(pool)
        .await
        .expect("送信上限の取得に失敗");

    rate_limit
}
