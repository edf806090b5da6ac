use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserResponse;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub username: String,
    pub token_type: TokenType, // access or refresh
    pub exp: usize,            // Expiration time
    pub iat: usize,            // Issued at
    pub jti: String,           // JWT ID (for revocation)
}

/// Password login; `username` may also carry an email address
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Registration form. Every field is optional on the wire so that
/// missing values produce the registration error instead of a JSON rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password1: Option<String>,
    #[serde(default)]
    pub password2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Authentication response models
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Tokens minted for a login: the access token goes in the body,
/// the refresh token in the cookie.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
}

/// Authenticated caller, attached to requests by the JWT middleware
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: Uuid,
    pub username: String,
    pub jti: String,
    pub exp: usize,
}

impl UserSession {
    pub fn from_claims(claims: &Claims) -> Result<Self, uuid::Error> {
        Ok(Self {
            user_id: Uuid::parse_str(&claims.sub)?,
            username: claims.username.clone(),
            jti: claims.jti.clone(),
            exp: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_request_tolerates_missing_fields() {
        let request: RegisterRequest = serde_json::from_value(json!({"email": "a@b.co"})).unwrap();
        assert_eq!(request.email.as_deref(), Some("a@b.co"));
        assert!(request.password1.is_none());
    }

    #[test]
    fn test_token_type_wire_format() {
        assert_eq!(serde_json::to_value(TokenType::Refresh).unwrap(), json!("refresh"));
    }
}
