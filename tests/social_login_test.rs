// Social login against a stubbed OAuth provider

mod common;

use assert_matches::assert_matches;
use pace::auth::social::{OAuthClient, Provider, ProviderEndpoints, SocialAuthError, SocialProfile};
use pace::auth::{AuthService, RegisterRequest};
use pace::config::OAuthClientConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, test_pool};

fn client_for(server: &MockServer) -> OAuthClient {
    let endpoints = ProviderEndpoints {
        authorize_url: format!("{}/authorize", server.uri()),
        token_url: format!("{}/token", server.uri()),
        userinfo_url: format!("{}/userinfo", server.uri()),
    };
    let config = OAuthClientConfig {
        client_id: "client-123".to_string(),
        client_secret: "shh".to_string(),
        redirect_uri: "http://localhost:8000/api/auth/social/google/callback".to_string(),
    };

    OAuthClient::new(Provider::Google, config, endpoints).unwrap()
}

#[tokio::test]
async fn test_code_exchange_and_userinfo() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "provider-token",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer provider-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "google-uid-1",
            "email": "Runner@Example.com",
            "given_name": "Ada",
            "family_name": "Runner",
            "picture": "https://img.test/ada.png",
            "locale": "en",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = client.exchange_code("auth-code").await.unwrap();
    assert_eq!(token, "provider-token");

    let profile = client.fetch_profile(&token).await.unwrap();
    assert_eq!(profile.uid, "google-uid-1");
    assert_eq!(profile.email, "Runner@Example.com");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.last_name, "Runner");
    assert_eq!(profile.extra_data["picture"], "https://img.test/ada.png");
}

#[tokio::test]
async fn test_failed_exchange_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let result = client_for(&server).exchange_code("stale").await;
    assert_matches!(result, Err(SocialAuthError::Provider(_)));
}

#[tokio::test]
async fn test_userinfo_without_email_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sub": "no-mail" })))
        .mount(&server)
        .await;

    let result = client_for(&server).fetch_profile("provider-token").await;
    assert_matches!(result, Err(SocialAuthError::MissingEmail));
}

fn profile(uid: &str, email: &str) -> SocialProfile {
    SocialProfile {
        provider: Provider::Google,
        uid: uid.to_string(),
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Runner".to_string(),
        extra_data: json!({ "picture": "https://img.test/ada.png", "locale": "en" }),
    }
}

#[tokio::test]
#[serial]
async fn test_social_login_links_accounts() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let auth = AuthService::new(pool, &test_config());
    let tag = Uuid::new_v4().simple().to_string();

    // New identity creates a password-less user
    let email = format!("social.{tag}@example.com");
    let uid = format!("uid-{tag}");
    let (created, tokens) = auth.social_login(profile(&uid, &email)).await.unwrap();
    assert!(!tokens.access.is_empty());

    // Same provider identity resolves to the same user
    let (again, _) = auth.social_login(profile(&uid, &email)).await.unwrap();
    assert_eq!(again.id, created.id);

    let info = auth.user_info(created.id).await.unwrap();
    assert_eq!(info.social_profiles["google"].picture.as_deref(), Some("https://img.test/ada.png"));

    // A new identity with a known email attaches to the existing account
    let registered_email = format!("linked.{tag}@example.com");
    let (registered, _) = auth
        .register(RegisterRequest {
            first_name: Some("Ada".to_string()),
            last_name: Some("Runner".to_string()),
            email: Some(registered_email.clone()),
            username: None,
            password1: Some("correct-horse-battery".to_string()),
            password2: Some("correct-horse-battery".to_string()),
        })
        .await
        .unwrap();

    let (linked, _) = auth
        .social_login(profile(&format!("other-{tag}"), &registered_email.to_uppercase()))
        .await
        .unwrap();
    assert_eq!(linked.id, registered.id);
}
