use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, patch, post},
    Router,
};
use axum_extra::extract::{CookieJar, WithRejection};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use crate::auth::cookies::{clear_refresh_cookie, read_refresh_cookie, refresh_cookie};
use crate::auth::social::{
    logout_redirect_url, social_callback_redirect_url, OAuthClient, Provider, SocialAuthError,
};
use crate::auth::{
    extract_bearer_token, jwt_auth_middleware, AuthError, AuthResponse, AuthService, IssuedTokens,
    LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, TokenResponse, UserSession,
};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserInfoResponse, UserResponse};

#[derive(Clone)]
pub struct AuthAppState {
    pub auth_service: AuthService,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SocialCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Authentication routes
pub fn auth_routes(auth_service: AuthService, config: Arc<AppConfig>) -> Router {
    let shared_state = AuthAppState {
        auth_service: auth_service.clone(),
        config,
    };

    Router::new()
        .route("/register", post(register))
        .route("/token", post(login))
        .route("/token/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout/redirect", get(logout_redirect))
        .route("/social/:provider/login", get(social_login))
        .route("/social/:provider/callback", get(social_callback))
        .route(
            "/user-info",
            get(user_info).route_layer(middleware::from_fn_with_state(
                auth_service.clone(),
                jwt_auth_middleware,
            )),
        )
        .route(
            "/onboarding/complete",
            patch(complete_onboarding).route_layer(middleware::from_fn_with_state(
                auth_service,
                jwt_auth_middleware,
            )),
        )
        .with_state(shared_state)
}

/// Body `{access, user}` with the refresh token set as a cookie
fn session_response(status: StatusCode, config: &AppConfig, user: &User, tokens: IssuedTokens) -> AppResult<Response> {
    Ok((
        status,
        [(SET_COOKIE, refresh_cookie(config, &tokens.refresh)?)],
        Json(AuthResponse {
            access: tokens.access,
            user: UserResponse::from(user),
        }),
    )
        .into_response())
}

/// Register a new user
#[tracing::instrument(skip(state, request))]
async fn register(
    State(state): State<AuthAppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<Response> {
    let (user, tokens) = state.auth_service.register(request).await?;
    session_response(StatusCode::CREATED, &state.config, &user, tokens)
}

/// Password login with username or email
#[tracing::instrument(skip(state, request))]
async fn login(
    State(state): State<AuthAppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Response> {
    let (user, tokens) = state.auth_service.login(request).await?;
    session_response(StatusCode::OK, &state.config, &user, tokens)
}

/// Exchange a refresh token (body or cookie) for a new access token
#[tracing::instrument(skip_all)]
async fn refresh_token(
    State(state): State<AuthAppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<Json<TokenResponse>> {
    let token = body
        .and_then(|Json(request)| request.refresh)
        .filter(|token| !token.is_empty())
        .or_else(|| read_refresh_cookie(&jar, &state.config))
        .ok_or(AuthError::MissingRefreshToken)?;

    let access = state.auth_service.refresh(&token).await?;
    Ok(Json(TokenResponse { access }))
}

/// Revoke the refresh cookie, blacklist the bearer token and clear the cookie
#[tracing::instrument(skip_all)]
async fn logout(State(state): State<AuthAppState>, jar: CookieJar, headers: HeaderMap) -> AppResult<Response> {
    let refresh = read_refresh_cookie(&jar, &state.config);
    let access = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| extract_bearer_token(value).ok());

    state.auth_service.logout(refresh.as_deref(), access).await?;

    Ok((
        [(SET_COOKIE, clear_refresh_cookie(&state.config)?)],
        Json(MessageResponse::new("logged out")),
    )
        .into_response())
}

/// Browser logout: revoke the cookie and bounce through the provider's logout if needed
#[tracing::instrument(skip_all)]
async fn logout_redirect(State(state): State<AuthAppState>, jar: CookieJar) -> AppResult<Response> {
    let mut provider = None;

    if let Some(refresh) = read_refresh_cookie(&jar, &state.config) {
        match state.auth_service.social_provider_for(&refresh).await {
            Ok(found) => provider = found,
            Err(err) => tracing::debug!("No social provider for logout: {}", err),
        }
        if let Err(err) = state.auth_service.logout(Some(&refresh), None).await {
            tracing::warn!("Failed to revoke refresh token on logout redirect: {}", err);
        }
    }

    let target = logout_redirect_url(provider, &state.config);
    Ok((
        [(SET_COOKIE, clear_refresh_cookie(&state.config)?)],
        Redirect::to(&target),
    )
        .into_response())
}

#[tracing::instrument(skip(state))]
async fn user_info(State(state): State<AuthAppState>, session: UserSession) -> AppResult<Json<UserInfoResponse>> {
    let info = state.auth_service.user_info(session.user_id).await?;
    Ok(Json(info))
}

#[tracing::instrument(skip(state))]
async fn complete_onboarding(
    State(state): State<AuthAppState>,
    session: UserSession,
) -> AppResult<Json<MessageResponse>> {
    let message = if state.auth_service.complete_onboarding(session.user_id).await? {
        "Onboarding marked as completed."
    } else {
        "Onboarding already completed."
    };

    Ok(Json(MessageResponse::new(message)))
}

/// Start the authorization-code flow with a signed `state`
#[tracing::instrument(skip(state))]
async fn social_login(State(state): State<AuthAppState>, Path(provider): Path<String>) -> AppResult<Redirect> {
    let provider = Provider::from_str(&provider).map_err(AuthError::from)?;
    let client = OAuthClient::from_config(provider, &state.config).map_err(AuthError::from)?;
    let login_state = state.auth_service.jwt().create_state_token(provider.as_str())?;

    Ok(Redirect::to(&client.authorization_url(&login_state)))
}

/// Provider callback: verify state, fetch the profile, sign the user in
#[tracing::instrument(skip(state, query))]
async fn social_callback(
    State(state): State<AuthAppState>,
    Path(provider): Path<String>,
    WithRejection(Query(query), _): WithRejection<Query<SocialCallbackQuery>, AppError>,
) -> AppResult<Response> {
    let provider = Provider::from_str(&provider).map_err(AuthError::from)?;

    if let Some(error) = query.error {
        tracing::warn!("{} login returned an error: {}", provider.as_str(), error);
        return Err(AuthError::from(SocialAuthError::Provider(error)).into());
    }

    let login_state = query.state.ok_or(AuthError::from(SocialAuthError::InvalidState))?;
    state
        .auth_service
        .jwt()
        .verify_state_token(&login_state, provider.as_str())
        .map_err(|_| AuthError::from(SocialAuthError::InvalidState))?;
    let code = query.code.ok_or(AuthError::from(SocialAuthError::MissingCode))?;

    let client = OAuthClient::from_config(provider, &state.config).map_err(AuthError::from)?;
    let provider_token = client.exchange_code(&code).await.map_err(AuthError::from)?;
    let profile = client.fetch_profile(&provider_token).await.map_err(AuthError::from)?;

    let (user, tokens) = state.auth_service.social_login(profile).await?;
    tracing::info!("User {} signed in with {}", user.id, provider.as_str());

    Ok((
        [(SET_COOKIE, refresh_cookie(&state.config, &tokens.refresh)?)],
        Redirect::to(&social_callback_redirect_url(&state.config)),
    )
        .into_response())
}
