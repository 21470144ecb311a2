/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Account endpoints (register, login, tokens, verification, passwords)
/// - `projects`: Projects and their members
/// - `tasks`: Tasks and subtasks
/// - `notes`: Project notes
///
/// Every project-scoped handler starts with [`project_access`] before touching
/// any data: an unknown project is `404`, then the caller's membership role
/// must be allowed for the action (`403` otherwise).

pub mod auth;
pub mod health;
pub mod notes;
pub mod projects;
pub mod tasks;

use crate::{app::AppState, error::ApiError};
use serde::{Deserialize, Deserializer};
use taskboard_shared::{
    auth::{
        authorization::{check_permission, ProjectAccess, ProjectAction},
        middleware::AuthContext,
    },
    models::project::Project,
};
use uuid::Uuid;

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Resolves the caller's access to a project for one action
pub(crate) async fn project_access(
    state: &AppState,
    auth: &AuthContext,
    project_id: Uuid,
    action: ProjectAction,
) -> Result<ProjectAccess, ApiError> {
    if Project::find_by_id(&state.db, project_id).await?.is_none() {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    let access = check_permission(&state.db, auth.user_id(), project_id, action).await?;
    Ok(access)
}

/// Deserializes a patch field so that `null` and absence differ
///
/// Absent stays `None` (with `#[serde(default)]`), `null` becomes
/// `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a required text field, rejecting blank input
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, format!("{} is required", field)));
    }

    Ok(trimmed.to_string())
}

/// Like [`required_text`], for fields that may be absent in a patch
pub(crate) fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    value.map(|v| required_text(field, &v)).transpose()
}

/// Blank descriptions are stored as no description
pub(crate) fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
