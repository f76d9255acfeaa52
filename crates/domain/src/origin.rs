//! # オリジン検証
//!
//! サービスの CORS 許可リストに対して、リクエストが宣言したオリジンを検証する。
//!
//! ## 判定規則
//!
//! 1. 許可リストが空 → 常に許可（制限なし）
//! 2. オリジンを URL としてパース。失敗 → [`DispatchError::InvalidOrigin`]
//! 3. 許可リストをカンマで分割し、前後の空白を除去して各エントリを URL としてパース
//!    （パースできないエントリは読み飛ばす）
//! 4. スキームが完全一致し、かつホスト名が一致またはドット区切りの厳密なサブドメインなら許可
//! 5. どのエントリにも一致しない → [`DispatchError::OriginNotAllowed`]
//!
//! `https://example.com` は `https://app.example.com` を許可するが、
//! `https://example.com.evil.com` や `https://badexample.com` は許可しない。

use url::Url;

use crate::DispatchError;

/// オリジンが許可リストで許可されているかを検証する
///
/// # 引数
///
/// - `allow_list`: カンマ区切りの許可リスト（空文字列は制限なし）
/// - `origin`: リクエストの `Origin` ヘッダー（未送信は `None`）
pub fn validate_origin(allow_list: &str, origin: Option<&str>) -> Result<(), DispatchError> {
    if allow_list.trim().is_empty() {
        return Ok(());
    }

    let raw_origin = origin.unwrap_or("");
    let parsed_origin =
        Url::parse(raw_origin).map_err(|_| DispatchError::InvalidOrigin(raw_origin.to_string()))?;
    let Some(origin_host) = parsed_origin.host_str() else {
        return Err(DispatchError::InvalidOrigin(raw_origin.to_string()));
    };

    let allowed = allow_list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| Url::parse(entry).ok())
        .any(|entry| {
            entry.scheme() == parsed_origin.scheme()
                && entry
                    .host_str()
                    .is_some_and(|allowed_host| host_matches(origin_host, allowed_host))
        });

    if allowed {
        Ok(())
    } else {
        Err(DispatchError::OriginNotAllowed(raw_origin.to_string()))
    }
}

/// ホスト名が一致、またはドット区切りのサブドメインか
fn host_matches(origin_host: &str, allowed_host: &str) -> bool {
    origin_host == allowed_host
        || origin_host
            .strip_suffix(allowed_host)
            .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
}
