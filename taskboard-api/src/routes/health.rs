/// Health check endpoint
///
/// ```text
/// GET /api/v1/healthcheck
/// ```
///
/// Always answers 200 while the process is up; `database` reports whether the
/// pool can reach PostgreSQL.
///
/// ```json
/// {
///   "statusCode": 200,
///   "data": { "status": "healthy", "version": "0.1.0", "database": "connected" },
///   "message": "Server is healthy",
///   "success": true
/// }
/// ```

use crate::{app::AppState, response::ApiResponse};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use taskboard_shared::db::pool;

/// Health check payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let connected = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    ApiResponse::ok(
        HealthResponse {
            status: if connected { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
        },
        "Server is healthy",
    )
}
