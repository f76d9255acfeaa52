//! lettre に定義のない独自ヘッダー

use lettre::message::header::{Header, HeaderName, HeaderValue};

type ParseError = Box<dyn std::error::Error + Send + Sync>;

/// `X-Priority` ヘッダー（3 = 通常）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XPriority(pub u8);

impl XPriority {
    pub const NORMAL: Self = Self(3);
}

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, ParseError> {
        Ok(Self(s.trim().parse()?))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.to_string())
    }
}

/// `X-Mailer` ヘッダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMailer(pub String);

impl Header for XMailer {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Mailer")
    }

    fn parse(s: &str) -> Result<Self, ParseError> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}
