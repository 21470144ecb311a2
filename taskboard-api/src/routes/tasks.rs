/// Task and subtask endpoints
///
/// # Endpoints
///
/// | Route | Roles |
/// |---|---|
/// | `GET /api/v1/tasks/:project_id` | any member |
/// | `POST /api/v1/tasks/:project_id` | admin, project_admin |
/// | `GET /api/v1/tasks/:project_id/t/:task_id` | any member |
/// | `PUT\|DELETE /api/v1/tasks/:project_id/t/:task_id` | admin, project_admin |
/// | `POST /api/v1/tasks/:project_id/t/:task_id/subtasks` | admin, project_admin |
/// | `GET\|PUT /api/v1/tasks/:project_id/st/:subtask_id` | any member |
/// | `DELETE /api/v1/tasks/:project_id/st/:subtask_id` | admin, project_admin |
///
/// Tasks and subtasks are always looked up inside the project of the route;
/// an ID belonging to another project is `404`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    response::ApiResponse,
    routes::{clean_description, optional_text, project_access, required_text},
};
use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use taskboard_shared::{
    auth::{authorization::ProjectAction, middleware::AuthContext},
    models::{
        project_member::ProjectMember,
        subtask::{CreateSubtask, Subtask, UpdateSubtask},
        task::{Attachment, CreateTask, Task, TaskDetails, TaskStatus, TaskView, UpdateTask},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Must be a member of the project
    pub assigned_to: Option<Uuid>,

    /// Defaults to `to_do`
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Task patch; absent fields stay untouched, `null` clears nullable ones
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "crate::routes::double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "crate::routes::double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    pub status: Option<TaskStatus>,

    pub attachments: Option<Vec<Attachment>>,
}

/// Create subtask request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: String,
}

/// Subtask patch
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskRequest {
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

/// Checks attachment descriptors handed over by the upload collaborator
fn check_attachments(attachments: &[Attachment]) -> ApiResult<()> {
    for attachment in attachments {
        if attachment.url.trim().is_empty() {
            return Err(ApiError::invalid_field("attachments", "Attachment url is required"));
        }
        if attachment.size < 0 {
            return Err(ApiError::invalid_field(
                "attachments",
                "Attachment size must not be negative",
            ));
        }
    }
    Ok(())
}

/// Rejects an assignee who is not a member of the project
async fn ensure_assignee_is_member(
    state: &AppState,
    project_id: Uuid,
    assignee: Option<Uuid>,
) -> ApiResult<()> {
    let Some(user_id) = assignee else {
        return Ok(());
    };

    if ProjectMember::get_role(&state.db, project_id, user_id)
        .await?
        .is_none()
    {
        return Err(ApiError::invalid_field(
            "assignedTo",
            "Assignee must be a member of the project",
        ));
    }

    Ok(())
}

impl UpdateTaskRequest {
    fn into_patch(self) -> ApiResult<UpdateTask> {
        if let Some(attachments) = &self.attachments {
            check_attachments(attachments)?;
        }

        Ok(UpdateTask {
            title: optional_text("title", self.title)?,
            description: self.description.map(clean_description),
            assigned_to: self.assigned_to,
            status: self.status,
            attachments: self.attachments,
        })
    }
}

impl UpdateSubtaskRequest {
    fn into_patch(self) -> ApiResult<UpdateSubtask> {
        Ok(UpdateSubtask {
            title: optional_text("title", self.title)?,
            is_completed: self.is_completed,
        })
    }
}

/// Lists the tasks of a project
pub async fn get_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<TaskView>>> {
    project_access(&state, &auth, project_id, ProjectAction::ListTasks).await?;

    let tasks = Task::list_views(&state.db, project_id).await?;

    Ok(ApiResponse::ok(tasks, "Tasks fetched successfully"))
}

/// Create a task
///
/// The caller is recorded as `assignedBy`.
///
/// # Errors
///
/// - `400 Bad Request`: Blank title, bad attachment, assignee not a member
/// - `404 Not Found`: Project does not exist
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    project_access(&state, &auth, project_id, ProjectAction::CreateTask).await?;
    req.validate()?;

    let title = required_text("title", &req.title)?;
    check_attachments(&req.attachments)?;
    ensure_assignee_is_member(&state, project_id, req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id,
            title,
            description: clean_description(req.description),
            assigned_to: req.assigned_to,
            assigned_by: auth.user_id(),
            status: req.status,
            attachments: req.attachments,
        },
    )
    .await?;

    tracing::info!(
        project_id = %project_id,
        task_id = %task.id,
        status = task.status.as_str(),
        "Task created"
    );

    Ok(ApiResponse::created(task, "Task created successfully"))
}

/// Get a task with user summaries and subtasks
pub async fn get_task_by_id(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<TaskDetails>> {
    project_access(&state, &auth, project_id, ProjectAction::ViewTask).await?;

    let details = Task::find_details(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(ApiResponse::ok(details, "Task fetched successfully"))
}

/// Partially update a task
///
/// Only fields present in the body change.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    project_access(&state, &auth, project_id, ProjectAction::UpdateTask).await?;
    req.validate()?;

    let patch = req.into_patch()?;
    if let Some(assignee) = patch.assigned_to {
        ensure_assignee_is_member(&state, project_id, assignee).await?;
    }

    let task = Task::update(&state.db, project_id, task_id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    tracing::info!(project_id = %project_id, task_id = %task_id, "Task updated");

    Ok(ApiResponse::ok(task, "Task updated successfully"))
}

/// Delete a task and its subtasks
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    project_access(&state, &auth, project_id, ProjectAction::DeleteTask).await?;

    if !Task::delete(&state.db, project_id, task_id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(project_id = %project_id, task_id = %task_id, "Task deleted");

    Ok(ApiResponse::ok(json!({}), "Task deleted successfully"))
}

/// Create a subtask
///
/// # Errors
///
/// - `400 Bad Request`: Blank title or title over 255 characters
/// - `404 Not Found`: Task not in this project
pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CreateSubtaskRequest>,
) -> ApiResult<ApiResponse<Subtask>> {
    project_access(&state, &auth, project_id, ProjectAction::CreateSubtask).await?;

    req.validate()?;
    let title = required_text("title", &req.title)?;

    let task = Task::find_in_project(&state.db, project_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let subtask = Subtask::create(
        &state.db,
        CreateSubtask {
            task_id: task.id,
            title,
            created_by: auth.user_id(),
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, subtask_id = %subtask.id, "Subtask created");

    Ok(ApiResponse::created(subtask, "Subtask created successfully"))
}

/// Get one subtask
pub async fn get_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, subtask_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Subtask>> {
    project_access(&state, &auth, project_id, ProjectAction::ViewSubtask).await?;

    let subtask = Subtask::find_in_project(&state.db, project_id, subtask_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    Ok(ApiResponse::ok(subtask, "Subtask fetched successfully"))
}

/// Partially update a subtask (title, completion)
pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, subtask_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateSubtaskRequest>,
) -> ApiResult<ApiResponse<Subtask>> {
    project_access(&state, &auth, project_id, ProjectAction::UpdateSubtask).await?;

    req.validate()?;
    let patch = req.into_patch()?;

    let subtask = Subtask::update_in_project(&state.db, project_id, subtask_id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Subtask not found".to_string()))?;

    tracing::info!(subtask_id = %subtask_id, is_completed = subtask.is_completed, "Subtask updated");

    Ok(ApiResponse::ok(subtask, "Subtask updated successfully"))
}

/// Delete a subtask
pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, subtask_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    project_access(&state, &auth, project_id, ProjectAction::DeleteSubtask).await?;

    if !Subtask::delete_in_project(&state.db, project_id, subtask_id).await? {
        return Err(ApiError::NotFound("Subtask not found".to_string()));
    }

    tracing::info!(subtask_id = %subtask_id, "Subtask deleted");

    Ok(ApiResponse::ok(json!({}), "Subtask deleted successfully"))
}
