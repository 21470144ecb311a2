/// Account endpoints
///
/// # Endpoints
///
/// Public:
/// - `POST /api/v1/auth/register` - Create an account and mail a verification link
/// - `POST /api/v1/auth/login` - Issue tokens (body and cookies)
/// - `GET  /api/v1/auth/verify-email/:token` - Consume a verification link
/// - `GET|POST /api/v1/auth/refresh-token` - Rotate tokens
/// - `POST /api/v1/auth/forgot-password` - Mail a password reset link
/// - `POST /api/v1/auth/reset-password/:token` - Consume a reset link
///
/// Authenticated:
/// - `POST /api/v1/auth/logout`
/// - `POST /api/v1/auth/current-user`
/// - `POST /api/v1/auth/change-password`
/// - `POST /api/v1/auth/resend-email-verification`
///
/// One-time links carry a random token; only its SHA-256 digest is stored,
/// with a 20-minute expiry. The refresh token is stored the same way, so a
/// rotated-out refresh token no longer works.

use crate::{
    app::AppState,
    cookies::{cleared_token_cookies, token_cookies},
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    mail::{deliver, password_reset_mail, verification_mail},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskboard_shared::{
    auth::{
        jwt::{issue_token_pair, validate_refresh_token, TokenPair},
        middleware::{AuthContext, REFRESH_TOKEN_COOKIE},
        password,
        tokens::{generate_temporary_token, hash_token, verify_token},
    },
    models::user::{CreateUser, PublicUser, User},
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,

    /// Checked against the full password policy after field validation
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(max = 100, message = "Full name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Refresh request; the cookie wins when both are present
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Forgot password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// `{ "user": ... }`
#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: PublicUser,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub access_token: String,
    pub refresh_token: String,
}

/// Lowercases and checks a username: letters, digits, `_`, `-`, `.`
fn normalize_username(username: &str) -> ApiResult<String> {
    let username = username.trim().to_lowercase();

    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if username.len() < 3 || !valid {
        return Err(ApiError::invalid_field(
            "username",
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }

    Ok(username)
}

fn check_password_policy(field: &str, candidate: &str) -> ApiResult<()> {
    password::validate_password_strength(candidate)
        .map_err(|message| ApiError::invalid_field(field, message))
}

/// Issues a token pair and stores the refresh token digest
async fn start_session(state: &AppState, user_id: uuid::Uuid) -> ApiResult<TokenPair> {
    let tokens = issue_token_pair(user_id, &state.config.token_settings())?;

    User::set_refresh_token_hash(&state.db, user_id, Some(&hash_token(&tokens.refresh_token)))
        .await?;

    Ok(tokens)
}

/// Creates and mails a fresh verification link
async fn send_verification(state: &AppState, user_id: uuid::Uuid, email: &str, username: &str) -> ApiResult<()> {
    let token = generate_temporary_token();

    User::set_email_verification_token(&state.db, user_id, &token.hashed, token.expires_at)
        .await?;

    let url = format!(
        "{}/api/v1/auth/verify-email/{}",
        state.config.api.server_url, token.unhashed
    );
    deliver(state.mailer.as_ref(), verification_mail(email, username, &url)).await;

    Ok(())
}

/// Register a new user
///
/// ```text
/// POST /api/v1/auth/register
///
/// { "email": "ada@example.com", "username": "ada", "password": "Secure123", "fullName": "Ada" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email or username taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<UserPayload>> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let username = normalize_username(&req.username)?;
    check_password_policy("password", &req.password)?;

    if User::email_or_username_taken(&state.db, &email, &username).await? {
        return Err(ApiError::Conflict(
            "User with email or username already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let full_name = req
        .full_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let user = User::create(
        &state.db,
        CreateUser {
            username,
            email,
            full_name,
            password_hash,
        },
    )
    .await?;

    send_verification(&state, user.id, &user.email, &user.username).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(
        UserPayload { user: user.into() },
        "User registered successfully and verification email has been sent on your email",
    ))
}

/// Login
///
/// Sets the `accessToken` and `refreshToken` cookies and returns both tokens.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<LoginPayload>)> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let tokens = start_session(&state, user.id).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        token_cookies(jar, &tokens, &state.config),
        ApiResponse::ok(
            LoginPayload {
                user: user.into(),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Logout: forgets the refresh token and clears both cookies
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<Value>)> {
    User::set_refresh_token_hash(&state.db, auth.user_id(), None).await?;

    tracing::info!(user_id = %auth.user_id(), "User logged out");

    Ok((
        cleared_token_cookies(jar, &state.config),
        ApiResponse::ok(json!({}), "User logged out"),
    ))
}

/// Returns the authenticated user
pub async fn current_user(Extension(auth): Extension<AuthContext>) -> ApiResponse<PublicUser> {
    ApiResponse::ok(auth.user, "Current user fetched successfully")
}

/// Change password
///
/// # Errors
///
/// - `400 Bad Request`: Old password wrong or new password too weak
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    if !password::verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::invalid_field("oldPassword", "Invalid old password"));
    }

    check_password_policy("newPassword", &req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

/// Rotates the token pair
///
/// The refresh token comes from the `refreshToken` cookie or the
/// `refreshToken` field of a JSON body. It must validate as a refresh JWT and
/// match the digest stored at the last login or refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, expired or already rotated token
pub async fn refresh_access_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, ApiResponse<TokenPayload>)> {
    let incoming = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.trim().is_empty())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token))
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".to_string()))?;

    let claims = validate_refresh_token(&incoming, &state.config.jwt.refresh_secret)
        .map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            ApiError::Unauthorized("Invalid refresh token".to_string())
        })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    let current = user.refresh_token_hash.as_deref().unwrap_or_default();
    if !verify_token(&incoming, current) {
        tracing::warn!(user_id = %user.id, "Stale refresh token presented");
        return Err(ApiError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let tokens = start_session(&state, user.id).await?;

    Ok((
        token_cookies(jar, &tokens, &state.config),
        ApiResponse::ok(
            TokenPayload {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}

/// Consumes an email verification link
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or expired token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<ApiResponse<Value>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest(
            "Email verification token is missing".to_string(),
        ));
    }

    let user = User::verify_email(&state.db, &hash_token(token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token is invalid or expired".to_string()))?;

    tracing::info!(user_id = %user.id, "Email verified");

    Ok(ApiResponse::ok(
        json!({ "isEmailVerified": true }),
        "Email is verified",
    ))
}

/// Mails a new verification link to the authenticated user
///
/// # Errors
///
/// - `409 Conflict`: Email already verified
pub async fn resend_email_verification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Value>> {
    if auth.user.is_email_verified {
        return Err(ApiError::Conflict("Email is already verified".to_string()));
    }

    send_verification(&state, auth.user.id, &auth.user.email, &auth.user.username).await?;

    Ok(ApiResponse::ok(json!({}), "Mail has been sent to your email ID"))
}

/// Mails a password reset link
///
/// Answers the same way whether or not the email belongs to an account.
pub async fn forgot_password_request(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;

    if let Some(user) = User::find_by_email(&state.db, &req.email).await? {
        let token = generate_temporary_token();

        User::set_forgot_password_token(&state.db, user.id, &token.hashed, token.expires_at)
            .await?;

        let url = format!(
            "{}/api/v1/auth/reset-password/{}",
            state.config.api.server_url, token.unhashed
        );
        deliver(
            state.mailer.as_ref(),
            password_reset_mail(&user.email, &user.username, &url),
        )
        .await;

        tracing::info!(user_id = %user.id, "Password reset requested");
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(ApiResponse::ok(
        json!({}),
        "Password reset mail has been sent on your mail id",
    ))
}

/// Consumes a password reset link
///
/// Also ends existing sessions by clearing the stored refresh token.
///
/// # Errors
///
/// - `400 Bad Request`: Weak password, unknown or expired token
pub async fn reset_forgot_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<Value>> {
    req.validate()?;
    check_password_policy("newPassword", &req.new_password)?;

    let password_hash = password::hash_password(&req.new_password)?;

    let user = User::reset_password(&state.db, &hash_token(token.trim()), &password_hash)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token is invalid or expired".to_string()))?;

    tracing::info!(user_id = %user.id, "Password reset");

    Ok(ApiResponse::ok(json!({}), "Password reset successfully"))
}
