use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Already hashed; `None` for accounts that only sign in through a provider.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Public shape of a user as returned by login, registration and refresh flows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub onboarding_completed: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            onboarding_completed: user.onboarding_completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SocialAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub uid: String,
    pub extra_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialProfileSummary {
    pub picture: Option<String>,
    pub locale: Option<String>,
}

impl From<&SocialAccount> for SocialProfileSummary {
    fn from(account: &SocialAccount) -> Self {
        let field = |key: &str| {
            account
                .extra_data
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Self {
            picture: field("picture"),
            locale: field("locale"),
        }
    }
}

/// Response of the user-info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub social_profiles: BTreeMap<String, SocialProfileSummary>,
}

impl UserInfoResponse {
    pub fn new(user: &User, accounts: &[SocialAccount]) -> Self {
        let social_profiles = accounts
            .iter()
            .map(|account| (account.provider.clone(), SocialProfileSummary::from(account)))
            .collect();

        Self {
            user: UserResponse::from(user),
            social_profiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "runner".to_string(),
            email: "runner@example.com".to_string(),
            password_hash: Some("$2b$12$hash".to_string()),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            onboarding_completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let value = serde_json::to_value(user()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "runner");
    }

    #[test]
    fn test_user_info_groups_social_profiles_by_provider() {
        let user = user();
        let account = SocialAccount {
            id: Uuid::new_v4(),
            user_id: user.id,
            provider: "google".to_string(),
            uid: "1234".to_string(),
            extra_data: json!({"picture": "https://img.test/a.jpg", "locale": "en"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let info = UserInfoResponse::new(&user, &[account]);
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["email"], "runner@example.com");
        assert_eq!(value["social_profiles"]["google"]["picture"], "https://img.test/a.jpg");
        assert_eq!(value["social_profiles"]["google"]["locale"], "en");
    }
}
