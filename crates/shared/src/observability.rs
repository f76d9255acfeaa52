//! # ログ出力の初期化
//!
//! 送信 API のプロセス全体で使う tracing subscriber を組み立てる。
//!
//! | 環境変数 | 既定値 | 内容 |
//! |---------|--------|------|
//! | `LOG_FORMAT` | `pretty` | `json` で 1 行 1 イベントの JSON 出力 |
//! | `RUST_LOG` | [`DEFAULT_LOG_FILTER`] | `EnvFilter` のディレクティブ |
//!
//! JSON 出力では送信パイプラインのスパンフィールド（宛先数など）が
//! `span` キーの下にまとめて出力される。

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_LOG_FILTER: &str = "info,sendgate=debug,tower_http=info";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 集約基盤向けの JSON
    Json,
    /// ターミナル向け
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` の値を解釈する
    ///
    /// 前後の空白と大文字小文字は無視する。解釈できない値は `None`。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    ///
    /// 解釈できない値は既定の `Pretty` に倒す。subscriber の初期化前なので警告は stderr へ出す。
    pub fn from_env() -> Self {
        let Ok(raw) = std::env::var("LOG_FORMAT") else {
            return Self::default();
        };
        Self::parse(&raw).unwrap_or_else(|| {
            eprintln!("LOG_FORMAT={raw:?} は解釈できないため pretty で出力します");
            Self::default()
        })
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 初期化完了ログに出すサービス名
    pub service_name:   String,
    pub log_format:     LogFormat,
    /// `RUST_LOG` が無いときに使うフィルタ
    pub default_filter: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    /// `RUST_LOG` 未設定時のフィルタを差し替える
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// グローバル subscriber を登録する
///
/// `ErrorLayer` も合わせて登録する。これによりインフラ層のエラーが保持する
/// `SpanTrace` に、エラー発生時点のスパン（宛先・サービスなど）が残る。
///
/// 既に subscriber が登録済みの場合はエラーを返す。
#[cfg(feature = "observability")]
pub fn init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let output = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "ログ出力を初期化しました"
    );
    Ok(())
}
