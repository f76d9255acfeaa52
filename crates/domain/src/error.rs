//! # 送信パイプラインのエラー分類
//!
//! 宛先ごとの送信処理で発生しうるエラーを列挙する。
//!
//! ## 伝播方針
//!
//! - すべてのバリアントは宛先単位で捕捉され、文字列化されて集約レスポンスに入る
//! - 兄弟宛先の処理を中断させることはない
//! - HTTP ステータスには変換しない（不正な JSON のみ HTTP 層で 400 を返す）
//!
//! | バリアント | 発生箇所 |
//! |-----------|---------|
//! | `InvalidUserKey` | ユーザーキーの解決 |
//! | `RateLimitExceeded` | 送信上限の確保 |
//! | `InvalidService` | サービスの取得 |
//! | `InvalidOrigin` / `OriginNotAllowed` | オリジン検証 |
//! | `InvalidTemplate` | テンプレートの取得 |
//! | `InvalidParameter` / `TemplateSyntax` / `TemplateExecution` | レンダリング |
//! | `Smtp` | SMTP 送信 |
//! | `Backend` | データストア |

use strum::IntoStaticStr;
use thiserror::Error;

/// 送信パイプラインのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchError {
    /// ユーザーキーからユーザーを解決できない
    #[error("ユーザーキーが不正です: {0}")]
    InvalidUserKey(String),

    /// 送信上限に達している
    #[error("送信上限に達しました")]
    RateLimitExceeded,

    /// サービスが存在しない、または別ユーザーの所有
    #[error("サービス ID が不正です")]
    InvalidService,

    /// リクエストのオリジンが URL として解釈できない
    #[error("オリジンが不正です: {0}")]
    InvalidOrigin(String),

    /// オリジンがサービスの許可リストに含まれない
    #[error("許可されていないオリジンです: {0}")]
    OriginNotAllowed(String),

    /// テンプレートが存在しない、または別ユーザーの所有
    #[error("テンプレート ID が不正です")]
    InvalidTemplate,

    /// パラメータの形式が不正（`date` が RFC 3339 でない等）
    #[error("パラメータが不正です: {0}")]
    InvalidParameter(String),

    /// テンプレートのコンパイルに失敗
    #[error("テンプレートの構文エラー: {0}")]
    TemplateSyntax(String),

    /// テンプレートの実行に失敗（未定義の変数参照等）
    #[error("テンプレートの実行エラー: {0}")]
    TemplateExecution(String),

    /// SMTP 送信に失敗
    #[error("SMTP 送信に失敗しました: {0}")]
    Smtp(String),

    /// データストアへのアクセスに失敗
    #[error("データストアエラー: {0}")]
    Backend(String),
}

impl DispatchError {
    /// ログの `error.kind` に出力する識別子
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DispatchError::RateLimitExceeded, "rate_limit_exceeded")]
    #[case(DispatchError::InvalidService, "invalid_service")]
    #[case(DispatchError::Smtp("timeout".to_string()), "smtp")]
    #[case(DispatchError::TemplateSyntax("x".to_string()), "template_syntax")]
    fn test_kindがsnake_caseの識別子を返す(
        #[case] error: DispatchError,
        #[case] expected: &str,
    ) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_displayに原因が含まれる() {
        let error = DispatchError::Smtp("535 authentication failed".to_string());

        assert_eq!(
            error.to_string(),
            "SMTP 送信に失敗しました: 535 authentication failed"
        );
    }
}
