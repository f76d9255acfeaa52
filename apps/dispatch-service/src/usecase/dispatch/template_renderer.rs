//! # テンプレートレンダラー
//!
//! 保存済みテンプレート（件名・HTML 本文）を宛先ごとのコンテキストで描画する。
//!
//! ## コンテキスト
//!
//! | 変数 | 内容 |
//! |------|------|
//! | `recipient.email_address` | 宛先アドレス |
//! | `recipient.name` | 宛先名（未指定は空文字列） |
//! | `params.<key>` | リクエストの `parameters` |
//!
//! ## フィルタ
//!
//! tera 組み込みの `upper` / `lower` / `title` に加えて `format_date` を登録する。
//! `format_date` は RFC 3339 文字列または Unix 秒を `YYYY-MM-DD HH:MM:SS` に整形する。
//!
//! 文字列の日付は入力のオフセットのまま整形する（UTC へは変換しない）。
//!
//! `params.date` が文字列の場合は描画前に RFC 3339 として検証し、
//! 解釈できなければ [`DispatchError::InvalidParameter`] を返す。
//!
//! ## エスケープ
//!
//! 件名・本文ともに自動エスケープしない。パラメータはそのまま埋め込まれるため、
//! リンクなどのマークアップを値として渡せる。

use std::{collections::HashMap, error::Error as _};

use chrono::DateTime;
use sendgate_domain::{DispatchError, dispatch::Recipient, template::EmailTemplate};
use serde_json::{Map, Value, json};
use tera::{Context, Tera};

const SUBJECT_TEMPLATE: &str = "subject.txt";
const BODY_TEMPLATE: &str = "body.txt";

/// 日付として事前検証するパラメータ名
const DATE_PARAMETER: &str = "date";

/// 日付の出力形式
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 描画済みの件名と本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject:   String,
    pub html_body: String,
}

/// テンプレートレンダラー
///
/// テンプレートはユーザーごと・リクエストごとに異なるため、
/// 描画のたびに tera インスタンスを組み立てる。
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 1 宛先分の件名と本文を描画する
    pub fn render(
        &self,
        template: &EmailTemplate,
        recipient: &Recipient,
        parameters: &Map<String, Value>,
    ) -> Result<RenderedEmail, DispatchError> {
        let context = build_context(recipient, parameters)?;

        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);
        engine.register_filter("format_date", format_date_filter);
        engine
            .add_raw_templates(vec![
                (SUBJECT_TEMPLATE, template.subject.as_str()),
                (BODY_TEMPLATE, template.content.as_str()),
            ])
            .map_err(|e| DispatchError::TemplateSyntax(describe(&e)))?;

        let subject = engine
            .render(SUBJECT_TEMPLATE, &context)
            .map_err(|e| DispatchError::TemplateExecution(describe(&e)))?;
        let html_body = engine
            .render(BODY_TEMPLATE, &context)
            .map_err(|e| DispatchError::TemplateExecution(describe(&e)))?;

        Ok(RenderedEmail { subject, html_body })
    }
}

fn build_context(
    recipient: &Recipient,
    parameters: &Map<String, Value>,
) -> Result<Context, DispatchError> {
    let mut params = parameters.clone();
    if let Some(Value::String(raw)) = params.get(DATE_PARAMETER) {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| DispatchError::InvalidParameter(format!("{DATE_PARAMETER}: {e}")))?;
        params.insert(DATE_PARAMETER.to_string(), Value::String(parsed.to_rfc3339()));
    }

    let mut context = Context::new();
    context.insert(
        "recipient",
        &json!({
            "email_address": recipient.email_address,
            "name": recipient.name.as_deref().unwrap_or(""),
        }),
    );
    context.insert("params", &params);
    Ok(context)
}

/// `format_date` フィルタ
fn format_date_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let formatted = match value {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .map_err(|e| {
                tera::Error::msg(format!(
                    "format_date: {raw:?} は RFC 3339 ではありません: {e}"
                ))
            })?,
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.format(DATE_FORMAT).to_string())
            .ok_or_else(|| {
                tera::Error::msg(format!("format_date: {number} は Unix 秒ではありません"))
            })?,
        other => {
            return Err(tera::Error::msg(format!(
                "format_date: 日付として扱えない値です: {other}"
            )));
        }
    };
    Ok(Value::String(formatted))
}

/// tera のエラーは原因が source 側に入るため、連鎖をたどって 1 行にまとめる
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sendgate_domain::{
        profile::UserId,
        template::{EmailTemplate, TemplateId},
    };

    use super::*;

    fn template(subject: &str, content: &str) -> EmailTemplate {
        EmailTemplate {
            id:          TemplateId::new(),
            user_id:     UserId::new(),
            subject:     subject.to_string(),
            content:     content.to_string(),
            from_name:   None,
            reply_to:    None,
            cc:          None,
            bcc:         None,
            to_override: None,
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_宛先とパラメータで件名と本文を描画する() {
        let sut = TemplateRenderer::new();
        let template = template(
            "Hello {{ recipient.name }}",
            "<p>{{ recipient.email_address }} / {{ params.plan }}</p>",
        );
        let recipient = Recipient::new("alice@example.com", Some("Alice"));

        let rendered = sut
            .render(&template, &recipient, &params(json!({ "plan": "pro" })))
            .unwrap();

        assert_eq!(
            rendered,
            RenderedEmail {
                subject:   "Hello Alice".to_string(),
                html_body: "<p>alice@example.com / pro</p>".to_string(),
            }
        );
    }

    #[test]
    fn test_宛先名が未指定なら空文字列になる() {
        let sut = TemplateRenderer::new();
        let template = template("[{{ recipient.name }}]", "body");
        let recipient = Recipient::new("alice@example.com", None);

        let rendered = sut.render(&template, &recipient, &Map::new()).unwrap();

        assert_eq!(rendered.subject, "[]");
    }

    #[rstest]
    #[case("{{ params.word | upper }}", "HELLO WORLD")]
    #[case("{{ params.word | lower }}", "hello world")]
    #[case("{{ params.word | title }}", "Hello World")]
    fn test_文字列フィルタが使える(#[case] content: &str, #[case] expected: &str) {
        let sut = TemplateRenderer::new();
        let template = template("subject", content);
        let recipient = Recipient::new("a@example.com", None);

        let rendered = sut
            .render(&template, &recipient, &params(json!({ "word": "hEllo wOrld" })))
            .unwrap();

        assert_eq!(rendered.html_body, expected);
    }

    #[test]
    fn test_date文字列はformat_dateで整形される() {
        let sut = TemplateRenderer::new();
        let template = template("subject", "{{ params.date | format_date }}");
        let recipient = Recipient::new("a@example.com", None);

        let rendered = sut
            .render(
                &template,
                &recipient,
                &params(json!({ "date": "2023-12-31T00:00:00Z" })),
            )
            .unwrap();

        assert_eq!(rendered.html_body, "2023-12-31 00:00:00");
    }

    #[test]
    fn test_format_dateはunix秒も受け付ける() {
        let sut = TemplateRenderer::new();
        let template = template("{{ params.sent_at | format_date }}", "body");
        let recipient = Recipient::new("a@example.com", None);

        let rendered = sut
            .render(&template, &recipient, &params(json!({ "sent_at": 1_704_067_200 })))
            .unwrap();

        assert_eq!(rendered.subject, "2024-01-01 00:00:00");
    }

    #[test]
    fn test_dateがrfc3339でなければinvalid_parameter() {
        let sut = TemplateRenderer::new();
        let template = template("subject", "{{ params.date }}");
        let recipient = Recipient::new("a@example.com", None);

        let result = sut.render(&template, &recipient, &params(json!({ "date": "31/12/2023" })));

        assert!(matches!(result, Err(DispatchError::InvalidParameter(_))));
    }

    #[test]
    fn test_構文エラーはtemplate_syntax() {
        let sut = TemplateRenderer::new();
        let template = template("subject", "<p>{{ recipient.name </p>");
        let recipient = Recipient::new("a@example.com", None);

        let result = sut.render(&template, &recipient, &Map::new());

        assert!(matches!(result, Err(DispatchError::TemplateSyntax(_))));
    }

    #[test]
    fn test_未定義の変数参照はtemplate_execution() {
        let sut = TemplateRenderer::new();
        let template = template("subject", "<p>{{ params.missing }}</p>");
        let recipient = Recipient::new("a@example.com", None);

        let result = sut.render(&template, &recipient, &Map::new());

        assert!(matches!(result, Err(DispatchError::TemplateExecution(_))));
    }

    #[test]
    fn test_タイムゾーン付きの日付は入力のオフセットのまま整形される() {
        let sut = TemplateRenderer::new();
        let template = template("subject", "{{ params.date | format_date }}");
        let recipient = Recipient::new("a@example.com", None);

        let rendered = sut
            .render(
                &template,
                &recipient,
                &params(json!({ "date": "2023-12-31T10:00:00+09:00" })),
            )
            .unwrap();

        assert_eq!(rendered.html_body, "2023-12-31 10:00:00");
    }

    #[test]
    fn test_本文のパラメータはエスケープせずにそのまま埋め込む() {
        let sut = TemplateRenderer::new();
        let link = r#"<a href="https://x.test/a?b=1&c=2">Reset</a>"#;
        let template = template("{{ params.link }}", "<p>{{ params.link }}</p>");
        let recipient = Recipient::new("a@example.com", None);

        let rendered = sut
            .render(&template, &recipient, &params(json!({ "link": link })))
            .unwrap();

        assert_eq!(rendered.subject, link);
        assert_eq!(rendered.html_body, format!("<p>{link}</p>"));
    }
}
