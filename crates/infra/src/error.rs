//! # インフラ層エラー
//!
//! PostgreSQL へのアクセスと、保存済みの行をドメインモデルへ戻す際の失敗を表す。
//!
//! [`InfraError`] は種別 [`InfraErrorKind`] に加えて、生成時点の [`SpanTrace`] を持つ。
//! リポジトリメソッドは `#[tracing::instrument]` 付きなので、
//! 送信パイプラインのログには「どのリポジトリ呼び出しで失敗したか」が残る。
//!
//! SMTP の失敗は [`sendgate_domain::email::MailerError`] 側で扱う。

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// クエリ実行・接続・プール取得の失敗
    #[error("データベースエラー: {0}")]
    Database(#[from] sqlx::Error),

    #[error("マイグレーションエラー: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// 行の値がドメインの制約を満たさない（範囲外の SMTP ポートなど）
    #[error("不正な保存データ: {0}")]
    InvalidData(String),

    /// モックから注入する失敗など、上記に当てはまらないもの
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

/// インフラ層エラー
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

impl InfraError {
    pub fn invalid_data(detail: impl Into<String>) -> Self {
        InfraErrorKind::InvalidData(detail.into()).into()
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        InfraErrorKind::Unexpected(detail.into()).into()
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// エラー生成時点のスパン
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// プールから接続を取得できなかった（DB 停止・接続数枯渇）
    pub fn is_pool_timeout(&self) -> bool {
        matches!(self.kind, InfraErrorKind::Database(sqlx::Error::PoolTimedOut))
    }
}

impl From<InfraErrorKind> for InfraError {
    fn from(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        InfraErrorKind::from(source).into()
    }
}

impl From<sqlx::migrate::MigrateError> for InfraError {
    fn from(source: sqlx::migrate::MigrateError) -> Self {
        InfraErrorKind::from(source).into()
    }
}

impl std::fmt::Debug for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}\n{}", self.kind, self.span_trace)
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    fn in_span(name: &'static str, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("repository", method = name);
            let _entered = span.enter();
            f();
        });
    }

    #[test]
    fn test_sqlxエラーから生成するとリポジトリのスパンが残る() {
        in_span("try_reserve_quota", || {
            let err = InfraError::from(sqlx::Error::PoolTimedOut);

            assert!(err.is_pool_timeout());
            let trace = err.span_trace().to_string();
            assert!(trace.contains("repository"), "{trace}");
            assert!(format!("{err:?}").contains("PoolTimedOut"));
        });
    }

    #[test]
    fn test_invalid_dataは元エラーを持たない() {
        in_span("find_by_id_and_user", || {
            let err = InfraError::invalid_data("smtp_port=70000");

            assert!(matches!(err.kind(), InfraErrorKind::InvalidData(d) if d == "smtp_port=70000"));
            assert!(err.source().is_none());
            assert!(!err.is_pool_timeout());
        });
    }

    #[test]
    fn test_displayは種別のメッセージになる() {
        let err = InfraError::unexpected("insert failed");

        assert_eq!(err.to_string(), "予期しないエラー: insert failed");
    }

    #[test]
    fn test_データベースエラーはsourceを辿れる() {
        let err = InfraError::from(sqlx::Error::RowNotFound);

        assert!(err.source().is_some());
    }
}
