//! # Canonical Log Line ミドルウェア
//!
//! HTTP リクエスト完了時に、メソッド・パス・ステータス・レイテンシを 1 行に集約した
//! サマリログを出力する tower Layer。
//!
//! `TraceLayer` の内側に配置すると、スパンフィールドが JSON ログに自動的に含まれる:
//!
//! ```text
//! TraceLayer → CanonicalLogLineLayer → handler
//! ```

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use http::{Request, Response};
use tower::{Layer, Service};

/// ログ出力対象外のパスかどうか
///
/// `/health` と `/health/ready` はロードバランサーから高頻度で叩かれるため除外する。
fn is_health_check_path(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// Canonical Log Line を出力する Layer
#[derive(Clone, Debug, Default)]
pub struct CanonicalLogLineLayer;

impl<S> Layer<S> for CanonicalLogLineLayer {
    type Service = CanonicalLogLineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CanonicalLogLineService { inner }
    }
}

/// [`CanonicalLogLineLayer`] が生成する Service
#[derive(Clone, Debug)]
pub struct CanonicalLogLineService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CanonicalLogLineService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // poll_ready 済みの inner を使い、代わりにクローンを残す
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let summary = RequestSummary::start(&req);
        Box::pin(async move {
            let result = inner.call(req).await;
            if let Some(summary) = summary {
                match &result {
                    Ok(response) => summary.completed(response.status().as_u16()),
                    Err(err) => summary.failed(err),
                }
            }
            result
        })
    }
}

/// 1 リクエスト分のサマリ。ヘルスチェックでは作らない
struct RequestSummary {
    method:  String,
    path:    String,
    started: Instant,
}

impl RequestSummary {
    fn start<B>(req: &Request<B>) -> Option<Self> {
        let path = req.uri().path();
        if is_health_check_path(path) {
            return None;
        }
        Some(Self {
            method:  req.method().to_string(),
            path:    path.to_owned(),
            started: Instant::now(),
        })
    }

    fn latency_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn completed(self, status: u16) {
        tracing::info!(
            log.r#type = "canonical",
            http.method = %self.method,
            http.path = %self.path,
            http.status_code = status,
            http.outcome = outcome(status),
            http.latency_ms = self.latency_ms(),
            "リクエスト完了"
        );
    }

    fn failed(self, err: &impl std::fmt::Display) {
        tracing::error!(
            log.r#type = "canonical",
            http.method = %self.method,
            http.path = %self.path,
            http.latency_ms = self.latency_ms(),
            error.message = %err,
            "リクエスト処理エラー"
        );
    }
}

/// ステータスコードの分類（不正な JSON による 400 を集計で拾うため）
fn outcome(status: u16) -> &'static str {
    match status {
        500.. => "server_error",
        400..=499 => "client_error",
        _ => "success",
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[derive(Clone)]
    struct FixedStatusService(http::StatusCode);

    impl Service<Request<()>> for FixedStatusService {
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let status = self.0;
            Box::pin(async move { Ok(Response::builder().status(status).body(()).unwrap()) })
        }
    }

    /// イベントのフィールドを (名前, 値) で記録する Layer
    #[derive(Clone, Default)]
    struct CaptureLayer {
        events: Arc<Mutex<Vec<Vec<(String, String)>>>>,
    }

    struct FieldVisitor<'a>(&'a mut Vec<(String, String)>);

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }

        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.0.push((field.name().to_string(), value.to_string()));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = Vec::new();
            event.record(&mut FieldVisitor(&mut fields));
            self.events.lock().unwrap().push(fields);
        }
    }

    fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_送信リクエストでステータスとパスが1行に出力される() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(http::StatusCode::OK));
        let request = Request::builder()
            .method("POST")
            .uri("/send-emails")
            .body(())
            .unwrap();
        sut.call(request).await.unwrap();

        let events = capture.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(field(&events[0], "log.type"), Some("canonical"));
        assert_eq!(field(&events[0], "http.status_code"), Some("200"));
        assert_eq!(field(&events[0], "http.path"), Some("/send-emails"));
        assert_eq!(field(&events[0], "http.method"), Some("POST"));
        assert_eq!(field(&events[0], "http.outcome"), Some("success"));
    }

    #[tokio::test]
    async fn test_不正なリクエストはclient_errorとして出力される() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(http::StatusCode::BAD_REQUEST));
        sut.call(Request::builder().uri("/send-emails").body(()).unwrap())
            .await
            .unwrap();

        let events = capture.events.lock().unwrap();
        assert_eq!(field(&events[0], "http.status_code"), Some("400"));
        assert_eq!(field(&events[0], "http.outcome"), Some("client_error"));
    }

    #[tokio::test]
    async fn test_ヘルスチェックではログが出力されない() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(http::StatusCode::OK));
        for path in ["/health", "/health/ready"] {
            sut.call(Request::builder().uri(path).body(()).unwrap())
                .await
                .unwrap();
        }

        assert!(capture.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_healthで始まる別パスは除外しない() {
        assert!(is_health_check_path("/health"));
        assert!(is_health_check_path("/health/ready"));
        assert!(!is_health_check_path("/healthcare"));
        assert!(!is_health_check_path("/send-emails"));
    }
}
