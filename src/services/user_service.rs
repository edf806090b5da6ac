use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{username_from_email, CreateUser, SocialAccount, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, onboarding_completed, created_at, updated_at";

/// Account storage shared by password and social sign-in
#[derive(Debug, Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a user together with its empty fitness profile.
    pub async fn create_user(&self, user_data: CreateUser) -> Result<User, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let user = Self::insert_user(&mut tx, user_data).await?;
        tx.commit().await?;

        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Insert a user and its profile on an existing connection or transaction
    pub async fn insert_user(conn: &mut PgConnection, user_data: CreateUser) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user_data.username)
        .bind(&user_data.email)
        .bind(&user_data.password_hash)
        .bind(&user_data.first_name)
        .bind(&user_data.last_name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO fitness_profiles (id, user_id) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(user.id)
            .execute(&mut *conn)
            .await?;

        Ok(user)
    }

    /// First free username derived from `base`: `base`, then `base1`, `base2`, ...
    pub async fn available_username(conn: &mut PgConnection, base: &str) -> Result<String, sqlx::Error> {
        let base = if base.is_empty() { "user" } else { base };
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT username FROM users WHERE username = $1 OR username LIKE $2",
        )
        .bind(base)
        .bind(format!("{}%", base.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
        .fetch_all(&mut *conn)
        .await?;

        Ok(next_free_username(base, &taken))
    }

    /// Username for a new account registered with `email`
    pub async fn username_for_email(&self, email: &str) -> Result<String, sqlx::Error> {
        let mut conn = self.db.acquire().await?;
        Self::available_username(&mut conn, &username_from_email(email)).await
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
    }

    /// Case-insensitive email lookup
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let mut conn = self.db.acquire().await?;
        let user = Self::find_by_email(&mut conn, email).await?;
        Ok(user)
    }

    pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(conn)
        .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn social_accounts(&self, user_id: Uuid) -> Result<Vec<SocialAccount>, sqlx::Error> {
        sqlx::query_as::<_, SocialAccount>(
            "SELECT id, user_id, provider, uid, extra_data, created_at, updated_at
             FROM social_accounts WHERE user_id = $1 ORDER BY provider",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
    }

    /// Mark onboarding as done. Returns `false` when it was already completed.
    pub async fn complete_onboarding(&self, user_id: Uuid) -> Result<Option<bool>, sqlx::Error> {
        let current: Option<bool> =
            sqlx::query_scalar("SELECT onboarding_completed FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        match current {
            None => Ok(None),
            Some(true) => Ok(Some(false)),
            Some(false) => {
                sqlx::query("UPDATE users SET onboarding_completed = TRUE, updated_at = NOW() WHERE id = $1")
                    .bind(user_id)
                    .execute(&self.db)
                    .await?;
                Ok(Some(true))
            }
        }
    }
}

/// Pick the first of `base`, `base1`, `base2`, ... that is not in `taken`
pub fn next_free_username(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|name| name == base) {
        return base.to_string();
    }

    (1..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{base}{}", Uuid::new_v4().simple()))
}
