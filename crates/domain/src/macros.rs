/// レコード ID の Newtype を定義する
///
/// ID は DB では `UUID` 列、リクエストでは文字列として現れる。
/// リクエスト由来の文字列は [`parse`](crate::service::ServiceId::parse) で変換し、
/// 解釈できない場合は呼び出し側で「不正なサービス / テンプレート」として扱う。
/// 新規レコードの ID は時刻順に並ぶ UUID v7 で採番する。
///
/// ```rust
/// use sendgate_domain::service::ServiceId;
///
/// let id = ServiceId::new();
/// assert_eq!(ServiceId::parse(&format!(" {id} ")), Some(id));
/// assert_eq!(ServiceId::parse("svc-1"), None);
/// ```
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $Name(uuid::Uuid);

        impl $Name {
            /// UUID v7 で採番する
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// 前後の空白を除いて UUID として解釈する
            pub fn parse(raw: &str) -> Option<Self> {
                raw.trim().parse::<uuid::Uuid>().ok().map(Self)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $Name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $Name {
            fn from(raw: uuid::Uuid) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// 秘匿文字列の Newtype を定義する宣言型マクロ
///
/// ユーザーキーや SMTP パスワードのように、ログへ平文で出してはいけない値に使う。
/// - `Debug` 出力を `[REDACTED]` にマスクする
/// - `Display` impl は生成しない
/// - `expose()` でのみ中身を取り出せる
///
/// ```rust
/// use sendgate_domain::profile::UserKey;
///
/// let key = UserKey::new("uk_live_123");
/// assert_eq!(key.expose(), "uk_live_123");
/// assert!(format!("{key:?}").contains("[REDACTED]"));
/// ```
macro_rules! define_secret_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl $Name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// 平文を取得する（DB クエリ・SMTP 認証でのみ使用）
            pub fn expose(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Debug for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($Name)).field(&"[REDACTED]").finish()
            }
        }
    };
}
