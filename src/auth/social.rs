use axum::http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

use crate::config::{AppConfig, OAuthClientConfig};

#[derive(Error, Debug)]
pub enum SocialAuthError {
    #[error("Unknown social login provider: {0}")]
    UnknownProvider(String),
    #[error("Social login provider {0} is not configured")]
    NotConfigured(&'static str),
    #[error("Invalid or expired login state")]
    InvalidState,
    #[error("Authorization code missing from callback")]
    MissingCode,
    #[error("Provider did not return an email address")]
    MissingEmail,
    #[error("Provider request failed: {0}")]
    Provider(String),
}

impl SocialAuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            SocialAuthError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            SocialAuthError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            SocialAuthError::InvalidState | SocialAuthError::MissingCode | SocialAuthError::MissingEmail => {
                StatusCode::BAD_REQUEST
            }
            SocialAuthError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for SocialAuthError {
    fn from(err: reqwest::Error) -> Self {
        SocialAuthError::Provider(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Microsoft,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Microsoft => "microsoft",
        }
    }
}

impl FromStr for Provider {
    type Err = SocialAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "microsoft" => Ok(Provider::Microsoft),
            other => Err(SocialAuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// OAuth2 / OIDC endpoints of a provider
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
        }
    }

    pub fn microsoft(authority: &str) -> Self {
        Self {
            authorize_url: format!("{authority}/oauth2/v2.0/authorize"),
            token_url: format!("{authority}/oauth2/v2.0/token"),
            userinfo_url: "https://graph.microsoft.com/oidc/userinfo".to_string(),
        }
    }
}

/// Identity returned by a provider's userinfo endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SocialProfile {
    pub provider: Provider,
    pub uid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Stored verbatim on the linked social account
    pub extra_data: Value,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OidcUserInfo {
    sub: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    locale: Option<String>,
}

/// Authorization-code client for one social login provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
    provider: Provider,
    config: OAuthClientConfig,
    endpoints: ProviderEndpoints,
}

impl OAuthClient {
    pub fn new(
        provider: Provider,
        config: OAuthClientConfig,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, SocialAuthError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            provider,
            config,
            endpoints,
        })
    }

    /// Client for `provider` as configured through the environment
    pub fn from_config(provider: Provider, config: &AppConfig) -> Result<Self, SocialAuthError> {
        let (client_config, endpoints) = match provider {
            Provider::Google => (config.google.clone(), ProviderEndpoints::google()),
            Provider::Microsoft => (
                config.microsoft.clone(),
                ProviderEndpoints::microsoft(&config.microsoft_authority),
            ),
        };
        let client_config = client_config.ok_or(SocialAuthError::NotConfigured(provider.as_str()))?;

        Self::new(provider, client_config, endpoints)
    }

    /// Generate OAuth authorization URL
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state)
        )
    }

    /// Exchange authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, SocialAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("{} token exchange failed: {} - {}", self.provider.as_str(), status, error_text);
            return Err(SocialAuthError::Provider(format!("token exchange returned {status}")));
        }

        let token = response.json::<TokenExchangeResponse>().await?;
        Ok(token.access_token)
    }

    /// Fetch the OIDC userinfo for an access token
    pub async fn fetch_profile(&self, access_token: &str) -> Result<SocialProfile, SocialAuthError> {
        let response = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("{} userinfo request failed: {} - {}", self.provider.as_str(), status, error_text);
            return Err(SocialAuthError::Provider(format!("userinfo returned {status}")));
        }

        let info = response.json::<OidcUserInfo>().await?;
        profile_from_userinfo(self.provider, info)
    }
}

fn profile_from_userinfo(provider: Provider, info: OidcUserInfo) -> Result<SocialProfile, SocialAuthError> {
    let email = info
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or(SocialAuthError::MissingEmail)?;

    // Some Microsoft accounts only carry a display name
    let (first_name, last_name) = match (info.given_name, info.family_name) {
        (Some(first), Some(last)) => (first, last),
        (first, last) => {
            let mut parts = info.name.as_deref().unwrap_or_default().splitn(2, ' ');
            let from_name_first = parts.next().unwrap_or_default().to_string();
            let from_name_last = parts.next().unwrap_or_default().to_string();
            (first.unwrap_or(from_name_first), last.unwrap_or(from_name_last))
        }
    };

    let extra_data = json!({
        "sub": &info.sub,
        "email": email,
        "given_name": first_name,
        "family_name": last_name,
        "picture": info.picture,
        "locale": info.locale,
    });

    Ok(SocialProfile {
        provider,
        uid: info.sub,
        email,
        first_name,
        last_name,
        extra_data,
    })
}

/// Where the browser goes after logout, based on how the user signed in
pub fn logout_redirect_url(provider: Option<Provider>, config: &AppConfig) -> String {
    let frontend = &config.frontend_url;
    match provider {
        Some(Provider::Microsoft) => format!(
            "{}/oauth2/v2.0/logout?post_logout_redirect_uri={frontend}?clearSession=true",
            config.microsoft_authority
        ),
        Some(Provider::Google) => format!("{frontend}?clearSession=true&provider=google"),
        None => format!("{frontend}?clearSession=true"),
    }
}

/// Frontend landing page after a successful social login
pub fn social_callback_redirect_url(config: &AppConfig) -> String {
    format!("{}/oauth-callback", config.frontend_url)
}
