//! # プロファイル
//!
//! 送信 API の利用者（テナント）を表す。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`UserKey`] | ユーザーキー | クライアントが提示する不透明な資格情報。ユーザー ID に一意に解決される |
//! | [`UserId`] | ユーザー ID | サービス・テンプレートの所有者。以降のフィルタはすべてこの値を使う |
//! | [`Profile::rate_limit`] | 送信上限 | 残り送信可能数。外部の定期処理でリセットされる |
//!
//! ## 不変条件
//!
//! - ユーザーキーは 1 つのユーザー ID にのみ解決される（DB の UNIQUE 制約）
//! - 送信上限はこのシステムの減算によって負にならない

use serde::{Deserialize, Serialize};

define_uuid_id! {
    /// ユーザー ID
    ///
    /// ユーザーキーから解決された値のみを信頼する。
    /// クライアントがリクエストで直接指定することはできない。
    pub struct UserId;
}

define_uuid_id! {
    /// プロファイル ID
    pub struct ProfileId;
}

define_secret_string! {
    /// ユーザーキー（クライアントが提示する唯一の信頼できる入力）
    pub struct UserKey;
}

/// プロファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id:         ProfileId,
    pub user_id:    UserId,
    /// 残り送信可能数
    pub rate_limit: i32,
}

impl Profile {
    /// 送信可能な残数があるか
    pub fn has_quota(&self) -> bool {
        self.rate_limit > 0
    }
}

/// 送信上限の確保結果
///
/// 「残数の確認」と「減算」を 1 回の条件付き UPDATE で行った結果を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaReservation {
    /// 1 件分を確保した（`remaining` は確保後の残数）
    Granted { remaining: i32 },
    /// 残数が 0 以下のため確保できなかった
    Exhausted,
}
