/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`jwt`]: Access/refresh token issuing and validation
/// - [`tokens`]: One-time email verification and password reset tokens
/// - [`middleware`]: The authentication gate (credential extraction and identity lookup)
/// - [`authorization`]: The per-project capability table and permission check
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{check_permission, ProjectAction};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let access = check_permission(&pool, user_id, project_id, ProjectAction::DeleteTask).await?;
/// println!("caller is {}", access.role.as_str());
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;
