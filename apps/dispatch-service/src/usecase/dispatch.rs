//! # 送信ユースケース
//!
//! - [`TemplateRenderer`] - テンプレートの描画
//! - [`DispatchOrchestrator`] - 宛先 1 件分のパイプライン
//! - [`FanOutCoordinator`] - 全宛先の並行実行と集約

mod fan_out;
mod orchestrator;
mod template_renderer;

pub use fan_out::FanOutCoordinator;
pub use orchestrator::{DispatchDeps, DispatchOrchestrator};
pub use template_renderer::{RenderedEmail, TemplateRenderer};
