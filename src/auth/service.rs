use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::social::{Provider, SocialProfile};
use crate::auth::{AuthError, IssuedTokens, JwtService, LoginRequest, RegisterRequest, TokenType, UserSession};
use crate::config::AppConfig;
use crate::models::{validate_email, validate_username, CreateUser, User, UserInfoResponse};
use crate::services::UserService;

/// How a social login maps onto local accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialResolution {
    /// The provider identity is already linked to this user
    Linked(Uuid),
    /// A user with the same email exists and gets the identity attached
    ExistingEmail(Uuid),
    /// No match; a new password-less account is created
    NewUser,
}

impl SocialResolution {
    pub fn decide(linked_user: Option<Uuid>, email_user: Option<Uuid>) -> Self {
        match (linked_user, email_user) {
            (Some(user_id), _) => SocialResolution::Linked(user_id),
            (None, Some(user_id)) => SocialResolution::ExistingEmail(user_id),
            (None, None) => SocialResolution::NewUser,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    users: UserService,
    db: PgPool,
}

impl AuthService {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            jwt_service: JwtService::from_config(config),
            users: UserService::new(db.clone()),
            db,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Register a new password account
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, IssuedTokens), AuthError> {
        let required = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (Some(first_name), Some(last_name), Some(email), Some(password1), Some(password2)) = (
            required(request.first_name),
            required(request.last_name),
            required(request.email),
            request.password1.filter(|p| !p.is_empty()),
            request.password2.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingFields);
        };

        if password1 != password2 {
            return Err(AuthError::PasswordMismatch);
        }

        validate_email(&email).map_err(AuthError::EmailValidation)?;

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let username = match required(request.username) {
            Some(username) => {
                validate_username(&username).map_err(AuthError::UsernameValidation)?;
                if self.users.get_user_by_username(&username).await?.is_some() {
                    return Err(AuthError::UsernameValidation(
                        "A user with that username already exists.".to_string(),
                    ));
                }
                username
            }
            None => self.users.username_for_email(&email).await?,
        };

        let password_hash = hash_password(&password1).map_err(|err| match err {
            PasswordError::HashingFailed | PasswordError::VerificationFailed => AuthError::PasswordHashing(err),
            policy => AuthError::PasswordValidation(policy.to_string()),
        })?;

        let user = self
            .users
            .create_user(CreateUser {
                username,
                email,
                password_hash: Some(password_hash),
                first_name,
                last_name,
            })
            .await
            .map_err(|err| {
                if crate::error::is_unique_violation(&err) {
                    AuthError::EmailAlreadyExists
                } else {
                    AuthError::Database(err)
                }
            })?;

        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    /// Login with username or email and password
    pub async fn login(&self, request: LoginRequest) -> Result<(User, IssuedTokens), AuthError> {
        let identifier = login_identifier(&request).ok_or(AuthError::InvalidCredentials)?;

        let user = if identifier.contains('@') {
            self.users.get_user_by_email(identifier).await?
        } else {
            self.users.get_user_by_username(identifier).await?
        }
        .ok_or(AuthError::InvalidCredentials)?;

        // Social-only accounts have no password to check against
        let password_hash = user.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
        if request.password.is_empty() || !verify_password(&request.password, password_hash)? {
            tracing::warn!("Failed login attempt for {}", user.username);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&user).await?;
        tracing::info!("User {} logged in", user.username);
        Ok((user, tokens))
    }

    /// Mint a new access token from an outstanding refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.jwt_service.validate_token(refresh_token, TokenType::Refresh)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        if !self.is_refresh_token_valid(&claims.jti, refresh_token).await? {
            return Err(AuthError::InvalidToken);
        }

        self.jwt_service.create_access_token(user_id, &claims.username)
    }

    /// Revoke the refresh token and blacklist the access token, whichever are present
    pub async fn logout(&self, refresh_token: Option<&str>, access_token: Option<&str>) -> Result<(), AuthError> {
        if let Some(refresh_token) = refresh_token {
            self.revoke_refresh_token(refresh_token).await?;
        }

        if let Some(access_token) = access_token {
            if let Ok(claims) = self.jwt_service.validate_token(access_token, TokenType::Access) {
                self.blacklist_token(&claims.jti, claims.exp as i64).await?;
            }
        }

        Ok(())
    }

    /// Provider the refresh token's owner signed in with, if any
    pub async fn social_provider_for(&self, refresh_token: &str) -> Result<Option<Provider>, AuthError> {
        let Ok(claims) = self.jwt_service.validate_token(refresh_token, TokenType::Refresh) else {
            return Ok(None);
        };
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Ok(None);
        };

        let provider: Option<String> = sqlx::query_scalar(
            "SELECT provider FROM social_accounts WHERE user_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(provider.and_then(|p| p.parse().ok()))
    }

    /// Check if token is blacklisted
    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()")
            .bind(jti)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(result.is_some())
    }

    /// Validate user session from token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        if self.is_token_blacklisted(&session.jti).await? {
            return Err(AuthError::InvalidToken);
        }

        Ok(session)
    }

    pub async fn user_info(&self, user_id: Uuid) -> Result<UserInfoResponse, AuthError> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let accounts = self.users.social_accounts(user_id).await?;

        Ok(UserInfoResponse::new(&user, &accounts))
    }

    /// Returns `true` when this call flipped the flag
    pub async fn complete_onboarding(&self, user_id: Uuid) -> Result<bool, AuthError> {
        self.users
            .complete_onboarding(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Resolve the local user for a provider identity, linking or creating as needed,
    /// and issue tokens for it.
    pub async fn social_login(&self, profile: SocialProfile) -> Result<(User, IssuedTokens), AuthError> {
        let provider = profile.provider.as_str();
        let mut tx = self.db.begin().await?;

        let linked_user: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM social_accounts WHERE provider = $1 AND uid = $2")
                .bind(provider)
                .bind(&profile.uid)
                .fetch_optional(&mut *tx)
                .await?;
        let email_user = UserService::find_by_email(&mut tx, &profile.email).await?;

        let user_id = match SocialResolution::decide(linked_user, email_user.as_ref().map(|u| u.id)) {
            SocialResolution::Linked(user_id) => user_id,
            SocialResolution::ExistingEmail(user_id) => {
                tracing::info!("Associating {} account with existing user {}", provider, user_id);
                user_id
            }
            SocialResolution::NewUser => {
                let username = UserService::available_username(
                    &mut tx,
                    &crate::models::username_from_email(&profile.email),
                )
                .await?;
                let user = UserService::insert_user(
                    &mut tx,
                    CreateUser {
                        username,
                        email: profile.email.clone(),
                        password_hash: None,
                        first_name: profile.first_name.clone(),
                        last_name: profile.last_name.clone(),
                    },
                )
                .await?;
                tracing::info!("Created user {} from {} login", user.username, provider);
                user.id
            }
        };

        sqlx::query(
            "INSERT INTO social_accounts (id, user_id, provider, uid, extra_data)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (provider, uid) DO UPDATE SET extra_data = EXCLUDED.extra_data, updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(provider)
        .bind(&profile.uid)
        .bind(&profile.extra_data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    // Private helper methods

    async fn issue_tokens(&self, user: &User) -> Result<IssuedTokens, AuthError> {
        let access = self.jwt_service.create_access_token(user.id, &user.username)?;
        let refresh = self.jwt_service.create_refresh_token(user.id, &user.username)?;

        sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&refresh.jti)
        .bind(user.id)
        .bind(token_fingerprint(&refresh.token))
        .bind(refresh.expires_at)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(IssuedTokens {
            access,
            refresh: refresh.token,
        })
    }

    async fn is_refresh_token_valid(&self, jti: &str, refresh_token: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "SELECT 1 FROM refresh_tokens
             WHERE jti = $1 AND token_hash = $2 AND expires_at > NOW() AND NOT revoked",
        )
        .bind(jti)
        .bind(token_fingerprint(refresh_token))
        .fetch_optional(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(result.is_some())
    }

    async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        // An expired or foreign token has nothing outstanding to revoke
        let Ok(claims) = self.jwt_service.validate_token(refresh_token, TokenType::Refresh) else {
            return Ok(());
        };

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1")
            .bind(&claims.jti)
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(())
    }

    async fn blacklist_token(&self, jti: &str, exp: i64) -> Result<(), AuthError> {
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0).ok_or(AuthError::InvalidToken)?;

        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }
}

/// Username if one was given, otherwise the email. Blank fields count as absent.
fn login_identifier(request: &LoginRequest) -> Option<&str> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    present(&request.username).or_else(|| present(&request.email))
}

/// Stored fingerprint of a refresh token
fn token_fingerprint(token: &str) -> String {
    format!("{:x}", md5::compute(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_identity_wins() {
        let linked = Uuid::new_v4();
        let by_email = Uuid::new_v4();
        assert_eq!(
            SocialResolution::decide(Some(linked), Some(by_email)),
            SocialResolution::Linked(linked)
        );
    }

    #[test]
    fn test_existing_email_is_associated() {
        let by_email = Uuid::new_v4();
        assert_eq!(
            SocialResolution::decide(None, Some(by_email)),
            SocialResolution::ExistingEmail(by_email)
        );
    }

    #[test]
    fn test_unknown_identity_creates_user() {
        assert_eq!(SocialResolution::decide(None, None), SocialResolution::NewUser);
    }

    #[test]
    fn test_token_fingerprint_is_stable_hex() {
        let fingerprint = token_fingerprint("abc");
        assert_eq!(fingerprint, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(fingerprint, token_fingerprint("abc"));
    }

    fn login(username: Option<&str>, email: Option<&str>) -> LoginRequest {
        LoginRequest {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_login_identifier_skips_blank_username() {
        let request = login(Some(""), Some("runner@example.com"));
        assert_eq!(login_identifier(&request), Some("runner@example.com"));

        let request = login(Some("   "), Some(" runner@example.com "));
        assert_eq!(login_identifier(&request), Some("runner@example.com"));
    }

    #[test]
    fn test_login_identifier_prefers_username() {
        let request = login(Some("runner"), Some("runner@example.com"));
        assert_eq!(login_identifier(&request), Some("runner"));
        assert_eq!(login_identifier(&login(Some(""), Some(""))), None);
        assert_eq!(login_identifier(&login(None, None)), None);
    }
}
