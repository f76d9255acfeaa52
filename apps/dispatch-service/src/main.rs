//! # Dispatch Service サーバー
//!
//! トランザクションメールの一括送信 API。
//!
//! ## エンドポイント
//!
//! | メソッド | パス | 説明 |
//! |---------|------|------|
//! | `POST` | `/send-emails` | テンプレートを宛先ごとに描画して SMTP 送信する |
//! | `GET` | `/health` | Liveness Check |
//! | `GET` | `/health/ready` | Readiness Check（DB 疎通） |
//!
//! 環境変数は [`sendgate_dispatch_service::config`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! DATABASE_URL=postgres://... RUN_MIGRATIONS=true cargo run -p sendgate-dispatch-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use sendgate_dispatch_service::{
    app_builder::build_app,
    config::DispatchConfig,
    handler::{ReadinessState, SendEmailsState},
    usecase::{DispatchDeps, DispatchOrchestrator, FanOutCoordinator},
};
use sendgate_domain::clock::SystemClock;
use sendgate_infra::{
    SmtpMailer,
    db,
    repository::{
        PostgresEmailHistoryRepository,
        PostgresProfileRepository,
        PostgresSendLogRepository,
        PostgresServiceRepository,
        PostgresTemplateRepository,
    },
};
use sendgate_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Dispatch Service のエントリーポイント
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込み
/// 4. DB 接続とマイグレーション
/// 5. 依存コンポーネントの組み立てとサーバー起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env("dispatch-service");
    init_tracing(&tracing_config).context("ログ出力の初期化に失敗しました")?;
    let _tracing_guard = tracing::info_span!("app", service = "dispatch-service").entered();

    let config = DispatchConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Dispatch Service を起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションの適用に失敗しました")?;
        tracing::info!("マイグレーションを適用しました");
    }

    let deps = DispatchDeps {
        profiles:  Arc::new(PostgresProfileRepository::new(pool.clone())),
        services:  Arc::new(PostgresServiceRepository::new(pool.clone())),
        templates: Arc::new(PostgresTemplateRepository::new(pool.clone())),
        send_logs: Arc::new(PostgresSendLogRepository::new(pool.clone())),
        history:   Arc::new(PostgresEmailHistoryRepository::new(pool.clone())),
        mailer:    Arc::new(SmtpMailer::new(
            config.dispatch.smtp_timeout,
            config.dispatch.mailer_name.clone(),
        )),
        clock:     Arc::new(SystemClock),
    };
    let coordinator = FanOutCoordinator::new(
        Arc::new(DispatchOrchestrator::new(deps)),
        config.dispatch.max_concurrency,
    );

    let app = build_app(
        Arc::new(SendEmailsState { coordinator }),
        Arc::new(ReadinessState { pool }),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Dispatch Service が起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
