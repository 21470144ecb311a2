/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(50) NOT NULL,              -- unique on LOWER(username)
///     email VARCHAR(255) NOT NULL,                -- unique on LOWER(email)
///     full_name VARCHAR(100),
///     avatar_url VARCHAR(512),
///     password_hash VARCHAR(255) NOT NULL,
///     is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     refresh_token_hash VARCHAR(64),
///     email_verification_token_hash VARCHAR(64),
///     email_verification_expiry TIMESTAMPTZ,
///     forgot_password_token_hash VARCHAR(64),
///     forgot_password_expiry TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Three read shapes exist:
///
/// - [`User`]: the full row, including credential and token hashes. Never serialized.
/// - [`PublicUser`]: what the authentication gate resolves and `current-user` returns.
/// - [`UserSummary`]: the `{id, username, fullName, avatarUrl}` view embedded in
///   tasks, members and notes.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     full_name: Some("Ada Lovelace".to_string()),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, full_name, avatar_url, password_hash, \
     is_email_verified, refresh_token_hash, email_verification_token_hash, \
     email_verification_expiry, forgot_password_token_hash, forgot_password_expiry, \
     created_at, updated_at";

const PUBLIC_USER_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, is_email_verified, created_at, updated_at";

/// Full user row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,

    /// Argon2id PHC string
    pub password_hash: String,

    pub is_email_verified: bool,

    /// SHA-256 of the refresh token issued at the last login/refresh
    pub refresh_token_hash: Option<String>,

    pub email_verification_token_hash: Option<String>,
    pub email_verification_expiry: Option<DateTime<Utc>>,
    pub forgot_password_token_hash: Option<String>,
    pub forgot_password_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User without credential or token columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Denormalized user reference embedded in other read views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Input for creating a new user
///
/// Callers normalize `username` and `email` (trimmed, lowercase) before insert.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
}

impl User {
    /// Creates a new, unverified user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation (`users_email_key` / `users_username_key`)
    /// when the email or username is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.full_name)
            .bind(data.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await
    }

    /// Checks whether the email or the username is already taken
    pub async fn email_or_username_taken(
        pool: &PgPool,
        email: &str,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) OR LOWER(username) = LOWER($2)
            )
            "#,
        )
        .bind(email)
        .bind(username)
        .fetch_one(pool)
        .await
    }

    /// Replaces the stored refresh token digest (`None` clears it, e.g. on logout)
    pub async fn set_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        refresh_token_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a pending email verification token digest
    pub async fn set_email_verification_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token_hash = $2,
                email_verification_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes an unexpired verification token and marks the email verified
    ///
    /// Returns `None` when no user holds this token or it has expired.
    pub async fn verify_email(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_token_hash = NULL,
                email_verification_expiry = NULL,
                updated_at = NOW()
            WHERE email_verification_token_hash = $1
              AND email_verification_expiry > NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Stores a pending password reset token digest
    pub async fn set_forgot_password_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET forgot_password_token_hash = $2,
                forgot_password_expiry = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes an unexpired reset token and sets a new password hash
    ///
    /// The stored refresh token is cleared as well, ending existing sessions.
    pub async fn reset_password(
        pool: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                forgot_password_token_hash = NULL,
                forgot_password_expiry = NULL,
                refresh_token_hash = NULL,
                updated_at = NOW()
            WHERE forgot_password_token_hash = $1
              AND forgot_password_expiry > NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .bind(password_hash)
            .fetch_optional(pool)
            .await
    }

    /// Sets a new password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl PublicUser {
    /// Loads the public view of a user; used by the authentication gate
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, PublicUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

impl UserSummary {
    /// Loads summaries for a set of user IDs, keyed by ID
    ///
    /// Unknown IDs are simply absent from the map.
    pub async fn find_by_ids(
        pool: &PgPool,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let summaries = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, username, full_name, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            avatar_url: None,
            password_hash: "$argon2id$v=19$secret".to_string(),
            is_email_verified: false,
            refresh_token_hash: Some("abc".to_string()),
            email_verification_token_hash: Some("def".to_string()),
            email_verification_expiry: Some(Utc::now()),
            forgot_password_token_hash: None,
            forgot_password_expiry: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_user_drops_secrets() {
        let user = sample_user();
        let id = user.id;
        let public = PublicUser::from(user);

        assert_eq!(public.id, id);
        let json = serde_json::to_value(&public).unwrap();
        let object = json.as_object().unwrap();

        assert!(object.contains_key("isEmailVerified"));
        assert!(object.contains_key("fullName"));
        for secret in [
            "passwordHash",
            "password_hash",
            "refreshTokenHash",
            "emailVerificationTokenHash",
            "forgotPasswordTokenHash",
        ] {
            assert!(!object.contains_key(secret), "{} leaked", secret);
        }
    }

    #[test]
    fn test_user_summary_shape() {
        let summary = UserSummary {
            id: Uuid::nil(),
            username: "ada".to_string(),
            full_name: None,
            avatar_url: Some("https://example.com/a.png".to_string()),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["username"], "ada");
        assert_eq!(json["avatarUrl"], "https://example.com/a.png");
        assert!(json["fullName"].is_null());
    }
}
