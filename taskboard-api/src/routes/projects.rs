/// Project and membership endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/projects` - Projects of the caller
/// - `POST   /api/v1/projects` - Create a project (caller becomes admin)
/// - `GET    /api/v1/projects/:project_id` - Any member
/// - `PUT    /api/v1/projects/:project_id` - Admin
/// - `DELETE /api/v1/projects/:project_id` - Admin, cascades to everything the project owns
/// - `GET    /api/v1/projects/:project_id/members` - Any member
/// - `POST   /api/v1/projects/:project_id/members` - Admin, add or re-role by email
/// - `PUT    /api/v1/projects/:project_id/members/:user_id` - Admin
/// - `DELETE /api/v1/projects/:project_id/members/:user_id` - Admin
///
/// Membership changes never leave a project without an admin (`409`).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    response::ApiResponse,
    routes::{clean_description, optional_text, project_access, required_text},
};
use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskboard_shared::{
    auth::{authorization::ProjectAction, middleware::AuthContext},
    models::{
        project::{CreateProject, Project, ProjectListing, UpdateProject},
        project_member::{MemberView, ProjectMember, ProjectRole},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(max = 100, message = "Project name must be at most 100 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Update project request; absent fields stay untouched
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(max = 100, message = "Project name must be at most 100 characters"))]
    pub name: Option<String>,

    /// `null` clears the description
    #[serde(default, deserialize_with = "crate::routes::double_option")]
    pub description: Option<Option<String>>,
}

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    pub role: ProjectRole,
}

/// Update member role request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: ProjectRole,
}

/// A project with the caller's role
#[derive(Debug, Serialize)]
pub struct ProjectPayload {
    #[serde(flatten)]
    pub project: Project,
    pub role: ProjectRole,
}

/// Lists the caller's projects with their role and member count
pub async fn get_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<ProjectListing>>> {
    let projects = Project::list_for_user(&state.db, auth.user_id()).await?;

    Ok(ApiResponse::ok(projects, "Projects fetched successfully"))
}

/// Create a project
///
/// # Errors
///
/// - `400 Bad Request`: Blank or too long name
/// - `409 Conflict`: Name already taken
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<ApiResponse<ProjectPayload>> {
    req.validate()?;
    let name = required_text("name", &req.name)?;

    let project = Project::create(
        &state.db,
        CreateProject {
            name,
            description: clean_description(req.description),
            created_by: auth.user_id(),
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id(), "Project created");

    Ok(ApiResponse::created(
        ProjectPayload {
            project,
            role: ProjectRole::Admin,
        },
        "Project created successfully",
    ))
}

/// Get one project
pub async fn get_project_by_id(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<ProjectPayload>> {
    let access = project_access(&state, &auth, project_id, ProjectAction::ViewProject).await?;

    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(ApiResponse::ok(
        ProjectPayload {
            project,
            role: access.role,
        },
        "Project fetched successfully",
    ))
}

/// Update a project's name or description
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<ProjectPayload>> {
    let access = project_access(&state, &auth, project_id, ProjectAction::UpdateProject).await?;
    req.validate()?;

    let patch = UpdateProject {
        name: optional_text("name", req.name)?,
        description: req.description.map(clean_description),
    };

    let project = Project::update(&state.db, project_id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project_id, "Project updated");

    Ok(ApiResponse::ok(
        ProjectPayload {
            project,
            role: access.role,
        },
        "Project updated successfully",
    ))
}

/// Delete a project with its tasks, subtasks, notes and memberships
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Value>> {
    project_access(&state, &auth, project_id, ProjectAction::DeleteProject).await?;

    if !Project::delete(&state.db, project_id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project_id, user_id = %auth.user_id(), "Project deleted");

    Ok(ApiResponse::ok(json!({}), "Project deleted successfully"))
}

/// List members with their roles
pub async fn get_project_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<MemberView>>> {
    project_access(&state, &auth, project_id, ProjectAction::ListMembers).await?;

    let members = ProjectMember::list_by_project(&state.db, project_id).await?;

    Ok(ApiResponse::ok(members, "Project members fetched successfully"))
}

/// Add a user by email, or change the role of an existing member
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
/// - `409 Conflict`: Would demote the last admin
pub async fn add_member_to_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    project_access(&state, &auth, project_id, ProjectAction::AddMember).await?;
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

    let member = ProjectMember::upsert(&state.db, project_id, user.id, req.role).await?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user.id,
        role = %member.role,
        "Project member added"
    );

    Ok(ApiResponse::created(member, "Project member added successfully"))
}

/// Change a member's role
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<ApiResponse<ProjectMember>> {
    project_access(&state, &auth, project_id, ProjectAction::UpdateMemberRole).await?;

    let member = ProjectMember::update_role(&state.db, project_id, user_id, req.role).await?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user_id,
        role = %member.role,
        "Project member role updated"
    );

    Ok(ApiResponse::ok(member, "Project member role updated successfully"))
}

/// Remove a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    project_access(&state, &auth, project_id, ProjectAction::RemoveMember).await?;

    ProjectMember::remove(&state.db, project_id, user_id).await?;

    tracing::info!(project_id = %project_id, user_id = %user_id, "Project member removed");

    Ok(ApiResponse::ok(json!({}), "Project member removed successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_null_clears_description() {
        let req: UpdateProjectRequest =
            serde_json::from_value(json!({ "description": null })).unwrap();
        assert!(req.name.is_none());
        assert_eq!(req.description, Some(None));

        let req: UpdateProjectRequest = serde_json::from_value(json!({ "name": "x" })).unwrap();
        assert!(req.description.is_none());
    }

    #[test]
    fn test_add_member_request_rejects_unknown_role() {
        let result = serde_json::from_value::<AddMemberRequest>(
            json!({ "email": "ada@example.com", "role": "owner" }),
        );
        assert!(result.is_err());

        let req: AddMemberRequest = serde_json::from_value(
            json!({ "email": "ada@example.com", "role": "project_admin" }),
        )
        .unwrap();
        assert_eq!(req.role, ProjectRole::ProjectAdmin);
    }
}
