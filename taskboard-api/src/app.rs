/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config, mail::LogMailer};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config, Arc::new(LogMailer));
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config, error::ApiError, mail::Mailer, middleware::security::SecurityHeadersLayer,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::middleware::authenticate;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// Cloned into each handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outgoing mail transport
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    /// Secret used to validate access tokens
    pub fn access_secret(&self) -> &str {
        &self.config.jwt.access_secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /api/v1
/// ├── GET  /healthcheck
/// ├── /auth
/// │   ├── POST /register, /login, /forgot-password, /reset-password/:token
/// │   ├── GET  /verify-email/:token
/// │   ├── GET|POST /refresh-token
/// │   └── (authenticated) POST /logout, /current-user, /change-password,
/// │                            /resend-email-verification
/// ├── /projects (authenticated)
/// │   ├── GET|POST /
/// │   ├── GET|PUT|DELETE /:project_id
/// │   ├── GET|POST /:project_id/members
/// │   └── PUT|DELETE /:project_id/members/:user_id
/// ├── /tasks (authenticated)
/// │   ├── GET|POST /:project_id
/// │   ├── GET|PUT|DELETE /:project_id/t/:task_id
/// │   ├── POST /:project_id/t/:task_id/subtasks
/// │   └── GET|PUT|DELETE /:project_id/st/:subtask_id
/// └── /notes (authenticated)
///     ├── GET|POST /:project_id
///     └── GET|PUT|DELETE /:project_id/n/:note_id
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, body limit, then the
/// authentication layer on the protected routers.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_layer = axum::middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/verify-email/:token", get(routes::auth::verify_email))
        .route(
            "/refresh-token",
            get(routes::auth::refresh_access_token).post(routes::auth::refresh_access_token),
        )
        .route("/forgot-password", post(routes::auth::forgot_password_request))
        .route("/reset-password/:token", post(routes::auth::reset_forgot_password));

    let protected_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/current-user", post(routes::auth::current_user))
        .route("/change-password", post(routes::auth::change_password))
        .route(
            "/resend-email-verification",
            post(routes::auth::resend_email_verification),
        )
        .layer(auth_layer.clone());

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::get_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project_by_id)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/members",
            get(routes::projects::get_project_members)
                .post(routes::projects::add_member_to_project),
        )
        .route(
            "/:project_id/members/:user_id",
            axum::routing::put(routes::projects::update_member_role)
                .delete(routes::projects::remove_member),
        )
        .layer(auth_layer.clone());

    let task_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::tasks::get_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:project_id/t/:task_id",
            get(routes::tasks::get_task_by_id)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:project_id/t/:task_id/subtasks",
            post(routes::tasks::create_subtask),
        )
        .route(
            "/:project_id/st/:subtask_id",
            get(routes::tasks::get_subtask)
                .put(routes::tasks::update_subtask)
                .delete(routes::tasks::delete_subtask),
        )
        .layer(auth_layer.clone());

    let note_routes = Router::new()
        .route(
            "/:project_id",
            get(routes::notes::get_notes).post(routes::notes::create_note),
        )
        .route(
            "/:project_id/n/:note_id",
            get(routes::notes::get_note_by_id)
                .put(routes::notes::update_note)
                .delete(routes::notes::delete_note),
        )
        .layer(auth_layer);

    let v1_routes = Router::new()
        .route("/healthcheck", get(routes::health::health_check))
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/notes", note_routes);

    let cors = cors_layer(&state.config);

    Router::new()
        .nest("/api/v1", v1_routes)
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS for the configured origins
///
/// Credentials are allowed so the browser sends the token cookies, which rules
/// out a literal `*`; a `*` entry therefore mirrors the request origin.
fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = if config.api.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Authentication layer for protected routes
///
/// Resolves the caller from the `accessToken` cookie or bearer header and
/// inserts the `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, req.headers(), state.access_secret())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
