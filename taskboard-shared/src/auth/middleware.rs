/// Authentication gate
///
/// Resolves the caller of a protected request into an [`AuthContext`]:
///
/// 1. Take the access token from the `accessToken` cookie, or failing that
///    from `Authorization: Bearer <token>`.
/// 2. Validate it as an access token (signature, expiry, issuer, type).
/// 3. Load the user named by `sub`, without credential columns.
///
/// Every failure is an [`AuthError`], which the API turns into a 401. The
/// router layer that runs this on each protected route lives in the API
/// crate; this module only knows about headers.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use taskboard_shared::auth::middleware::authenticate;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = authenticate(&pool, &headers, "access-secret").await?;
/// println!("request from {}", auth.user.username);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::PublicUser;

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Identity of an authenticated caller, added to request extensions
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: PublicUser,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

/// Error type for the authentication gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in cookie or header
    #[error("Unauthorized request")]
    MissingCredentials,

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    #[error("Invalid access token")]
    UnknownUser,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthError::InvalidToken("Access token expired".to_string()),
            _ => AuthError::InvalidToken("Invalid access token".to_string()),
        }
    }
}

/// Reads a non-empty cookie value from the `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Finds the access token of a request, cookie first
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_TOKEN_COOKIE)
        .or_else(|| bearer_token(headers).map(str::to_string))
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - [`AuthError::MissingCredentials`] if no token is present
/// - [`AuthError::InvalidToken`] if the token does not validate
/// - [`AuthError::UnknownUser`] if the token's user does not exist
/// - [`AuthError::DatabaseError`] if the user lookup fails
pub async fn authenticate(
    pool: &PgPool,
    headers: &HeaderMap,
    access_secret: &str,
) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;

    let claims = validate_access_token(&token, access_secret)?;

    let user = PublicUser::find_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext { user })
}
