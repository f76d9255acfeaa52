//! # リポジトリ
//!
//! 送信パイプラインが読み書きするレコードごとのリポジトリトレイトと PostgreSQL 実装。
//!
//! ## 設計方針
//!
//! - **所有者フィルタ**: サービス・テンプレートは常に `(id, user_id)` の組で取得する
//! - **実行時クエリ**: `sqlx::query_as` + `FromRow` で行を受け、ドメインモデルへ変換する
//! - **テスタビリティ**: ユースケース層はトレイトにのみ依存し、テストでは [`crate::mock`] に差し替える

pub mod email_history_repository;
pub mod profile_repository;
pub mod send_log_repository;
pub mod service_repository;
pub mod template_repository;

pub use email_history_repository::{EmailHistoryRepository, PostgresEmailHistoryRepository};
pub use profile_repository::{PostgresProfileRepository, ProfileRepository};
pub use send_log_repository::{PostgresSendLogRepository, SendLogRepository};
pub use service_repository::{PostgresServiceRepository, ServiceRepository};
pub use template_repository::{PostgresTemplateRepository, TemplateRepository};
