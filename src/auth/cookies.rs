use axum::http::HeaderValue;
use axum_extra::extract::CookieJar;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// `Set-Cookie` value carrying the refresh token.
///
/// HttpOnly with path `/`; `Secure` and `SameSite` follow configuration and
/// `Max-Age` matches the refresh token lifetime.
pub fn refresh_cookie(config: &AppConfig, token: &str) -> AppResult<HeaderValue> {
    build_cookie(config, token, config.refresh_token_days * 86_400)
}

/// `Set-Cookie` value that removes the refresh cookie
pub fn clear_refresh_cookie(config: &AppConfig) -> AppResult<HeaderValue> {
    build_cookie(config, "", 0)
}

/// Refresh token sent by the browser, if any
pub fn read_refresh_cookie(jar: &CookieJar, config: &AppConfig) -> Option<String> {
    jar.get(&config.refresh_cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

fn build_cookie(config: &AppConfig, value: &str, max_age: i64) -> AppResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite={}; Max-Age={}",
        config.refresh_cookie_name, value, config.cookie_same_site, max_age
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }

    // The name is checked at startup and tokens are base64url
    HeaderValue::from_str(&cookie)
        .map_err(|err| AppError::Internal(anyhow::anyhow!("invalid refresh cookie header: {err}")))
}
