//! # SendGate ドメイン層
//!
//! トランザクションメール送信 API のドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! dispatch-service → infra → domain
//!          ↘                  ↑
//!            ────────────────┘
//! ```
//!
//! ドメイン層はインフラ層（DB、SMTP）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`profile`] - ユーザーキー・送信上限を持つプロファイル
//! - [`service`] - SMTP 認証情報と CORS 許可リスト
//! - [`origin`] - リクエストオリジンの検証
//! - [`template`] - メールテンプレート
//! - [`dispatch`] - 送信リクエストと宛先
//! - [`email`] - SMTP に渡す送信メッセージ
//! - [`audit`] - 送信ログとメール履歴
//! - [`error`] - 送信パイプラインのエラー分類
//! - [`clock`] - 時刻プロバイダ

#[macro_use]
mod macros;

pub mod audit;
pub mod clock;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod origin;
pub mod profile;
pub mod service;
pub mod template;

pub use error::DispatchError;
