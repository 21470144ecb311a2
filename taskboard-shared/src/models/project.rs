/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT projects_name_key UNIQUE (name)
/// );
/// ```
///
/// # Lifecycle
///
/// - [`Project::create`] inserts the project and the creator's `admin`
///   membership in one transaction.
/// - [`Project::delete`] removes subtasks, tasks, notes, memberships and
///   finally the project, in one transaction.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     name: "Launch".to_string(),
///     description: None,
///     created_by: user_id,
/// }).await?;
///
/// assert!(Project::delete(&pool, project.id).await?);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::note::ProjectNote;
use super::project_member::{ProjectMember, ProjectRole};
use super::subtask::Subtask;
use super::task::Task;

const PROJECT_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at";

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    /// Role of the requesting user
    pub role: ProjectRole,

    pub member_count: i64,
}

/// Input for creating a new project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Partial update; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,

    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

impl Project {
    /// Creates a project and makes its creator an admin member
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `projects_name_key` for a taken name.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO projects (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(data.name)
            .bind(data.description)
            .bind(data.created_by)
            .fetch_one(&mut *tx)
            .await?;

        ProjectMember::insert(&mut tx, project.id, data.created_by, ProjectRole::Admin).await?;

        tx.commit().await?;
        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the projects `user_id` belongs to, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ProjectListing>, sqlx::Error> {
        sqlx::query_as::<_, ProjectListing>(
            r#"
            SELECT p.id, p.name, p.description, p.created_by, p.created_at, p.updated_at,
                   m.role,
                   (SELECT COUNT(*) FROM project_members c WHERE c.project_id = p.id) AS member_count
            FROM projects p
            JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the project does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {PROJECT_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a project and everything it owns
    ///
    /// Children go first (subtasks, tasks, notes, memberships) and the whole
    /// cascade commits or rolls back as one unit. Returns `false` if the
    /// project did not exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let subtasks = Subtask::delete_by_project(&mut tx, id).await?;
        let tasks = Task::delete_by_project(&mut tx, id).await?;
        let notes = ProjectNote::delete_by_project(&mut tx, id).await?;
        let members = ProjectMember::delete_by_project(&mut tx, id).await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;

        tracing::debug!(
            project_id = %id,
            subtasks,
            tasks,
            notes,
            members,
            "Project deleted with its children"
        );

        Ok(true)
    }
}
