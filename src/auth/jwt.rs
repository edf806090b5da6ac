use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthError, Claims, TokenType, UserSession};
use crate::config::AppConfig;

const STATE_TOKEN_MINUTES: i64 = 10;

/// A freshly signed token together with the values needed to track it
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Claims of the short-lived `state` parameter used in social login redirects
#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    provider: String,
    nonce: String,
    exp: usize,
}

/// JWT token service for creating and validating tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: Duration,
    refresh_token_expires_in: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .field("access_token_expires_in", &self.access_token_expires_in)
            .field("refresh_token_expires_in", &self.refresh_token_expires_in)
            .finish()
    }
}

impl JwtService {
    pub fn new(secret: &str, access_token_expires_in: Duration, refresh_token_expires_in: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in,
            refresh_token_expires_in,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    fn sign(&self, user_id: Uuid, username: &str, token_type: TokenType) -> Result<SignedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now
            + match token_type {
                TokenType::Access => self.access_token_expires_in,
                TokenType::Refresh => self.refresh_token_expires_in,
            };
        let jti = Uuid::new_v4().simple().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: jti.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Jwt)?;

        Ok(SignedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Create an access token for a user
    pub fn create_access_token(&self, user_id: Uuid, username: &str) -> Result<String, AuthError> {
        Ok(self.sign(user_id, username, TokenType::Access)?.token)
    }

    /// Create a refresh token for a user; the caller records its `jti` as outstanding.
    pub fn create_refresh_token(&self, user_id: Uuid, username: &str) -> Result<SignedToken, AuthError> {
        self.sign(user_id, username, TokenType::Refresh)
    }

    /// Validate a token's signature, expiry and type
    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?;

        if claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Extract user session from an access token
    pub fn extract_user_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let claims = self.validate_token(token, TokenType::Access)?;
        UserSession::from_claims(&claims).map_err(|_| AuthError::InvalidToken)
    }

    pub fn refresh_token_expires_in_seconds(&self) -> i64 {
        self.refresh_token_expires_in.num_seconds()
    }

    /// Sign the `state` round-tripped through a social login provider
    pub fn create_state_token(&self, provider: &str) -> Result<String, AuthError> {
        use rand::Rng;

        let nonce: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let claims = StateClaims {
            provider: provider.to_string(),
            nonce,
            exp: (Utc::now() + Duration::minutes(STATE_TOKEN_MINUTES)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Check a returned `state` was issued by us for this provider and has not expired
    pub fn verify_state_token(&self, token: &str, provider: &str) -> Result<(), AuthError> {
        let claims = decode::<StateClaims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.provider != provider {
            return Err(AuthError::InvalidToken);
        }

        Ok(())
    }
}

/// Extract bearer token from authorization header
pub fn extract_bearer_token(auth_header: &str) -> Result<&str, AuthError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeaderFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    Ok(token)
}
