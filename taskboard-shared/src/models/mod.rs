/// Database models for Taskboard
///
/// Each model is a row struct plus static async methods taking a `&PgPool`
/// (or the caller's transaction when the operation is part of a cascade).
///
/// # Models
///
/// - `user`: Accounts, credentials and one-time token hashes
/// - `project`: Projects and the project-delete cascade
/// - `project_member`: Per-project roles and the last-admin guard
/// - `task`: Tasks, partial updates and the task-delete cascade
/// - `subtask`: Checklist items under a task
/// - `note`: Free-text project notes
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::project::{CreateProject, Project};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: Some("Q3 marketing site".to_string()),
///     created_by: user_id,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod note;
pub mod project;
pub mod project_member;
pub mod subtask;
pub mod task;
pub mod user;
