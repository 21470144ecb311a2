/// Project note endpoints
///
/// Any member reads notes; only admins write them.
///
/// - `GET    /api/v1/notes/:project_id`
/// - `POST   /api/v1/notes/:project_id`
/// - `GET    /api/v1/notes/:project_id/n/:note_id`
/// - `PUT    /api/v1/notes/:project_id/n/:note_id`
/// - `DELETE /api/v1/notes/:project_id/n/:note_id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    response::ApiResponse,
    routes::{project_access, required_text},
};
use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use taskboard_shared::{
    auth::{authorization::ProjectAction, middleware::AuthContext},
    models::note::{NoteView, ProjectNote},
};
use uuid::Uuid;

/// Create or update note request
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub content: String,
}

fn note_not_found() -> ApiError {
    ApiError::NotFound("Note not found".to_string())
}

pub async fn get_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<ApiResponse<Vec<NoteView>>> {
    project_access(&state, &auth, project_id, ProjectAction::ListNotes).await?;

    let notes = ProjectNote::list_views(&state.db, project_id).await?;

    Ok(ApiResponse::ok(notes, "Notes fetched successfully"))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<ApiResponse<ProjectNote>> {
    project_access(&state, &auth, project_id, ProjectAction::CreateNote).await?;

    let content = required_text("content", &req.content)?;
    let note = ProjectNote::create(&state.db, project_id, auth.user_id(), &content).await?;

    tracing::info!(project_id = %project_id, note_id = %note.id, "Note created");

    Ok(ApiResponse::created(note, "Note created successfully"))
}

pub async fn get_note_by_id(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<NoteView>> {
    project_access(&state, &auth, project_id, ProjectAction::ViewNote).await?;

    let note = ProjectNote::find_view(&state.db, project_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::ok(note, "Note fetched successfully"))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<ApiResponse<ProjectNote>> {
    project_access(&state, &auth, project_id, ProjectAction::UpdateNote).await?;

    let content = required_text("content", &req.content)?;
    let note = ProjectNote::update_content(&state.db, project_id, note_id, &content)
        .await?
        .ok_or_else(note_not_found)?;

    tracing::info!(project_id = %project_id, note_id = %note_id, "Note updated");

    Ok(ApiResponse::ok(note, "Note updated successfully"))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, note_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Value>> {
    project_access(&state, &auth, project_id, ProjectAction::DeleteNote).await?;

    if !ProjectNote::delete_in_project(&state.db, project_id, note_id).await? {
        return Err(note_not_found());
    }

    tracing::info!(project_id = %project_id, note_id = %note_id, "Note deleted");

    Ok(ApiResponse::ok(json!({}), "Note deleted successfully"))
}
