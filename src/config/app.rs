use anyhow::{bail, Result};
use axum_extra::extract::cookie::SameSite;
use std::env;

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// OAuth client credentials for one social login provider
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    /// Read `<PREFIX>_CLIENT_ID`, `<PREFIX>_CLIENT_SECRET` and `<PREFIX>_REDIRECT_URI`.
    /// Returns `None` when the provider is not configured.
    fn from_env(prefix: &str, default_redirect: String) -> Option<Self> {
        let client_id = env::var(format!("{prefix}_CLIENT_ID")).ok()?;
        let client_secret = env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
        let redirect_uri =
            env::var(format!("{prefix}_REDIRECT_URI")).unwrap_or(default_redirect);

        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub refresh_cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub frontend_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub seed_catalog: bool,
    pub microsoft_authority: String,
    pub google: Option<OAuthClientConfig>,
    pub microsoft: Option<OAuthClientConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .unwrap_or(8000);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        let access_token_minutes = env::var("ACCESS_TOKEN_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let refresh_token_days = env::var("REFRESH_TOKEN_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let refresh_cookie_name =
            env::var("JWT_REFRESH_COOKIE_NAME").unwrap_or_else(|_| "refresh_token".to_string());
        let cookie_secure = parse_bool(env::var("COOKIE_SECURE").ok().as_deref(), environment == "production");
        let cookie_same_site = parse_same_site(
            &env::var("COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
        );

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| split_list(&origins))
            .unwrap_or_else(|_| vec![frontend_url.clone()]);

        let seed_catalog = parse_bool(env::var("SEED_CATALOG").ok().as_deref(), false);

        let microsoft_tenant = env::var("MICROSOFT_TENANT").unwrap_or_else(|_| "common".to_string());
        let microsoft_authority = env::var("MICROSOFT_AUTHORITY")
            .unwrap_or_else(|_| format!("https://login.microsoftonline.com/{microsoft_tenant}"))
            .trim_end_matches('/')
            .to_string();

        let public_base = format!("http://localhost:{port}");
        let google = OAuthClientConfig::from_env(
            "GOOGLE",
            format!("{public_base}/api/auth/social/google/callback"),
        );
        let microsoft = OAuthClientConfig::from_env(
            "MICROSOFT",
            format!("{public_base}/api/auth/social/microsoft/callback"),
        );

        let config = AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            access_token_minutes,
            refresh_token_days,
            refresh_cookie_name,
            cookie_secure,
            cookie_same_site,
            frontend_url,
            cors_allowed_origins,
            seed_catalog,
            microsoft_authority,
            google,
            microsoft,
        };

        if !is_valid_cookie_name(&config.refresh_cookie_name) {
            bail!(
                "JWT_REFRESH_COOKIE_NAME {:?} is not a valid cookie name",
                config.refresh_cookie_name
            );
        }

        if config.is_production() && config.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration suitable for tests and local tooling.
    pub fn for_testing(jwt_secret: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            jwt_secret: jwt_secret.to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
            refresh_cookie_name: "refresh_token".to_string(),
            cookie_secure: false,
            cookie_same_site: SameSite::Lax,
            frontend_url: "http://localhost:5173".to_string(),
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            seed_catalog: false,
            microsoft_authority: "https://login.microsoftonline.com/common".to_string(),
            google: None,
            microsoft: None,
        }
    }
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_same_site(value: &str) -> SameSite {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

/// RFC 6265 cookie-name: visible ASCII without separators
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&byte))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().trim_end_matches('/').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("true"), false));
        assert!(parse_bool(Some(" YES "), false));
        assert!(!parse_bool(Some("0"), true));
        assert!(parse_bool(Some("maybe"), true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn test_parse_same_site() {
        assert_eq!(parse_same_site("Strict"), SameSite::Strict);
        assert_eq!(parse_same_site("none"), SameSite::None);
        assert_eq!(parse_same_site("lax"), SameSite::Lax);
        assert_eq!(parse_same_site("bogus"), SameSite::Lax);
    }

    #[test]
    fn test_cookie_name_validation() {
        assert!(is_valid_cookie_name("refresh_token"));
        assert!(is_valid_cookie_name("__Host-pace.refresh"));
        assert!(!is_valid_cookie_name(""));
        assert!(!is_valid_cookie_name("refresh token"));
        assert!(!is_valid_cookie_name("refresh;token"));
        assert!(!is_valid_cookie_name("refresh=token"));
        assert!(!is_valid_cookie_name("réfresh"));
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_cookie_name_fails_startup() {
        env::set_var("JWT_REFRESH_COOKIE_NAME", "refresh token");
        let result = AppConfig::from_env();
        env::remove_var("JWT_REFRESH_COOKIE_NAME");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("JWT_REFRESH_COOKIE_NAME"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://a.test/, http://b.test ,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_server_address() {
        let config = AppConfig::for_testing("secret");
        assert_eq!(config.server_address(), "127.0.0.1:8000");
        assert!(!config.is_production());
    }
}
