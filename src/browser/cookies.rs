//! 会话 Cookie
//!
//! `COOKIES_BASE64` 是从已登录浏览器导出的 cookies.json 再做 base64 编码。

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use serde::Deserialize;

use crate::error::PostError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl SessionCookie {
    pub fn to_param(&self) -> Result<CookieParam, PostError> {
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .secure(self.secure)
            .http_only(self.http_only);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        builder
            .build()
            .map_err(|e| PostError::AuthFailed(format!("Cookie {} 无效: {}", self.name, e)))
    }
}

/// 解码 base64 编码的 cookie 数组，未配置时返回 `AuthFailed`
pub fn decode_cookies(encoded: Option<&str>) -> Result<Vec<SessionCookie>, PostError> {
    let encoded = encoded
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            PostError::AuthFailed("缺少 COOKIES_BASE64，请用 cookies.json 的 base64 生成".to_string())
        })?;

    let raw = STANDARD
        .decode(encoded)
        .map_err(|e| PostError::AuthFailed(format!("COOKIES_BASE64 解码失败: {}", e)))?;

    serde_json::from_slice(&raw)
        .map_err(|e| PostError::AuthFailed(format!("COOKIES_BASE64 不是合法的 cookie 数组: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exported_cookie_array() {
        let json = r#"[{"name":"auth_token","value":"abc","domain":".x.com","path":"/","secure":true,"httpOnly":true,"sameSite":"None"}]"#;
        let encoded = STANDARD.encode(json);

        let cookies = decode_cookies(Some(&encoded)).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "auth_token");
        assert!(cookies[0].http_only);
    }

    #[test]
    fn missing_or_garbage_is_auth_failure() {
        assert!(matches!(decode_cookies(None), Err(PostError::AuthFailed(_))));
        assert!(matches!(
            decode_cookies(Some("not base64!")),
            Err(PostError::AuthFailed(_))
        ));
    }
}
