//! # ファンアウト
//!
//! 1 リクエストの全宛先に対してオーケストレーターを並行実行し、結果を集約する。
//!
//! - 宛先ごとに `JoinSet` へタスクを spawn し、全タスクの完了を待ってから応答する
//! - 同時実行数はセマフォで制限する（リクエスト単位）
//! - エラーは完了順に並ぶ。宛先の順序は保証しない
//! - タスクが panic した場合もリクエストは失敗させず、エラー文字列として集約する

use std::sync::Arc;

use sendgate_domain::dispatch::{BatchResult, DispatchOutcome, DispatchRequest};
use sendgate_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};
use tokio::{sync::Semaphore, task::JoinSet};

use super::DispatchOrchestrator;

/// ファンアウトコーディネーター
#[derive(Clone)]
pub struct FanOutCoordinator {
    orchestrator:    Arc<DispatchOrchestrator>,
    max_concurrency: usize,
}

impl FanOutCoordinator {
    pub fn new(orchestrator: Arc<DispatchOrchestrator>, max_concurrency: usize) -> Self {
        Self {
            orchestrator,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// 全宛先へ送信し、バッチ全体の結果を返す
    #[tracing::instrument(skip_all, fields(recipients = request.recipients.len()))]
    pub async fn run(&self, request: DispatchRequest) -> BatchResult {
        let request = Arc::new(request);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for recipient in request.recipients.iter().cloned() {
            let orchestrator = Arc::clone(&self.orchestrator);
            let request = Arc::clone(&request);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // セマフォは close しないため取得に失敗することはない
                let _permit = semaphore.acquire_owned().await.ok();
                orchestrator.dispatch_one(&request, &recipient).await
            });
        }

        let mut outcomes = Vec::with_capacity(request.recipients.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::TASK_JOIN,
                    "送信タスクが異常終了: {}",
                    e
                );
                DispatchOutcome::Failed(format!("送信タスクが異常終了しました: {e}"))
            });
            outcomes.push(outcome);
        }

        let sent = outcomes.iter().filter(|o| o.is_sent()).count();
        let result = BatchResult::from_outcomes(outcomes);
        let event_result = if result.success {
            event::result::SUCCESS
        } else {
            event::result::FAILURE
        };

        log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::BATCH_COMPLETED,
            event.result = event_result,
            batch.sent = sent,
            batch.failed = result.errors.len(),
            "一括送信完了"
        );

        result
    }
}
