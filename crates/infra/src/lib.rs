//! # SendGate インフラ層
//!
//! 外部システム（PostgreSQL、SMTP サーバー）との接続・通信を担当する。
//!
//! ## 設計方針
//!
//! ユースケース層はリポジトリトレイトと [`Mailer`] トレイトにのみ依存し、
//! このクレートが PostgreSQL / lettre による具体実装を提供する。
//! テストでは [`mock`] のインメモリ実装に差し替える。
//!
//! ## 依存関係
//!
//! ```text
//! dispatch-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリトレイトと PostgreSQL 実装
//! - [`mailer`] - SMTP によるメール送信
//! - [`mock`] - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
pub mod mailer;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
pub use mailer::{Mailer, SmtpMailer};
