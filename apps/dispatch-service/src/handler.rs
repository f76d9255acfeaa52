//! # HTTP ハンドラ
//!
//! - [`health`] - Liveness / Readiness Check
//! - [`send_emails`] - 一括送信 API

pub mod health;
pub mod send_emails;

pub use health::{ReadinessState, health_check, readiness_check};
pub use send_emails::{SendEmailsRequest, SendEmailsState, send_emails};
