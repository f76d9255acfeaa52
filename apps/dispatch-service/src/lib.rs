//! # Dispatch Service ライブラリ
//!
//! 送信 API のユースケースとハンドラを公開する。
//! 統合テストからルーターを組み立てられるよう、バイナリとは別にライブラリとして提供する。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;
