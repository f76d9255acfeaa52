//! # Dispatch Service 設定
//!
//! 環境変数から送信 API サーバーの設定を読み込む。
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|-----------|------|
//! | `DISPATCH_HOST` | No | `0.0.0.0` | バインドアドレス |
//! | `PORT` | No | `8080` | ポート番号 |
//! | `DATABASE_URL` | **Yes** | - | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | `10` | 接続プールの最大接続数 |
//! | `RUN_MIGRATIONS` | No | `false` | 起動時にマイグレーションを適用するか |
//! | `DISPATCH_MAX_CONCURRENCY` | No | `16` | 1 リクエスト内で同時に処理する宛先数 |
//! | `SMTP_TIMEOUT_SECS` | No | `30` | SMTP サーバーとの通信タイムアウト（秒） |
//! | `MAILER_NAME` | No | `SendGate Mailer` | `X-Mailer` ヘッダーの値 |

use std::{str::FromStr, time::Duration};

use thiserror::Error;

/// `X-Mailer` ヘッダーのデフォルト値
pub const DEFAULT_MAILER_NAME: &str = "SendGate Mailer";

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Dispatch Service の設定
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub dispatch: DispatchSettings,
}

/// 送信パイプラインの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// 1 リクエスト内で同時に処理する宛先数の上限
    pub max_concurrency: usize,
    pub smtp_timeout:    Duration,
    pub mailer_name:     String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            smtp_timeout:    Duration::from_secs(30),
            mailer_name:     DEFAULT_MAILER_NAME.to_string(),
        }
    }
}

impl DispatchConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ソースから設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_concurrency: usize = parse_or(&lookup, "DISPATCH_MAX_CONCURRENCY", 16)?;
        if max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name:  "DISPATCH_MAX_CONCURRENCY",
                value: "0".to_string(),
            });
        }
        let smtp_timeout_secs: u64 = parse_or(&lookup, "SMTP_TIMEOUT_SECS", 30)?;

        Ok(Self {
            host: lookup("DISPATCH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_bool_or(&lookup, "RUN_MIGRATIONS", false)?,
            dispatch: DispatchSettings {
                max_concurrency,
                smtp_timeout: Duration::from_secs(smtp_timeout_secs),
                mailer_name: lookup("MAILER_NAME")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_MAILER_NAME.to_string()),
            },
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_bool_or(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
