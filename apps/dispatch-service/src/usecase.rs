//! # ユースケース層
//!
//! 送信パイプラインのビジネスロジックを実装する。
//! リポジトリとメーラーはトレイトオブジェクトとして注入する。

pub mod dispatch;

pub use dispatch::{DispatchDeps, DispatchOrchestrator, FanOutCoordinator, TemplateRenderer};
