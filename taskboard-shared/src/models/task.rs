/// Task model and database operations
///
/// Tasks belong to exactly one project and own their subtasks. Every lookup
/// here is scoped by project: a task ID that exists under another project is
/// reported as missing.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('to_do', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     assigned_to UUID REFERENCES users(id),
///     assigned_by UUID NOT NULL REFERENCES users(id),
///     status task_status NOT NULL DEFAULT 'to_do',
///     attachments JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Partial updates
///
/// [`UpdateTask`] carries one `Option` per patchable column. Only `Some`
/// fields reach the `SET` clause, so `{"status": "done"}` cannot touch the
/// title, description or assignee.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{Task, TaskStatus, UpdateTask};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, task_id: Uuid) -> Result<(), sqlx::Error> {
/// let patch = UpdateTask {
///     status: Some(TaskStatus::Done),
///     ..Default::default()
/// };
/// let task = Task::update(&pool, project_id, task_id, patch).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::subtask::Subtask;
use super::user::UserSummary;

const TASK_COLUMNS: &str = "id, project_id, title, description, assigned_to, assigned_by, \
     status, attachments, created_at, updated_at";

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started (initial state)
    #[default]
    ToDo,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Converts status to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "to_do",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Descriptor of an uploaded file attached to a task
///
/// Uploads are handled elsewhere; only the resulting descriptor is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub mimetype: String,

    /// Size in bytes
    pub size: i64,
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,

    /// Assignee; always a member of the project when set
    pub assigned_to: Option<Uuid>,

    /// User who created the task
    pub assigned_by: Uuid,

    pub status: TaskStatus,
    pub attachments: Json<Vec<Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assigned_by: Uuid,

    /// Defaults to `to_do` when not given
    pub status: Option<TaskStatus>,

    pub attachments: Vec<Attachment>,
}

/// Partial task update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,

    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,

    /// `Some(None)` unassigns the task
    pub assigned_to: Option<Option<Uuid>>,

    pub status: Option<TaskStatus>,

    /// Replaces the attachment list
    pub attachments: Option<Vec<Attachment>>,
}

impl UpdateTask {
    /// Builds the `UPDATE` statement for the present fields
    ///
    /// `$1` is the task ID, `$2` the project ID; patched columns follow in
    /// field declaration order, matching the bind order in [`Task::update`].
    pub fn to_sql(&self) -> String {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        let columns = [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("assigned_to", self.assigned_to.is_some()),
            ("status", self.status.is_some()),
            ("attachments", self.attachments.is_some()),
        ];

        for (column, present) in columns {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(
            " WHERE id = $1 AND project_id = $2 RETURNING {TASK_COLUMNS}"
        ));
        query
    }
}

/// Task read view with assignee and assigner resolved to user summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserSummary>,
    pub assigned_by: Option<UserSummary>,
    pub status: TaskStatus,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    fn from_task(task: Task, users: &HashMap<Uuid, UserSummary>) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
            assigned_by: users.get(&task.assigned_by).cloned(),
            status: task.status,
            attachments: task.attachments.0,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Single-task read view: the task plus its subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: TaskView,
    pub subtasks: Vec<Subtask>,
}

fn referenced_users(tasks: &[Task]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = tasks
        .iter()
        .flat_map(|t| std::iter::once(t.assigned_by).chain(t.assigned_to))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (project_id, title, description, assigned_to, assigned_by, status, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.assigned_to)
            .bind(data.assigned_by)
            .bind(data.status.unwrap_or_default())
            .bind(Json(data.attachments))
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID within a project
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND project_id = $2");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the tasks of a project, oldest first, with user summaries
    pub async fn list_views(pool: &PgPool, project_id: Uuid) -> Result<Vec<TaskView>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY created_at ASC"
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;

        let users = UserSummary::find_by_ids(pool, &referenced_users(&tasks)).await?;

        Ok(tasks
            .into_iter()
            .map(|task| TaskView::from_task(task, &users))
            .collect())
    }

    /// Loads one task with user summaries and subtasks
    pub async fn find_details(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error> {
        let Some(task) = Self::find_in_project(pool, project_id, id).await? else {
            return Ok(None);
        };

        let users = UserSummary::find_by_ids(pool, &referenced_users(std::slice::from_ref(&task)))
            .await?;
        let subtasks = Subtask::list_by_task(pool, task.id).await?;

        Ok(Some(TaskDetails {
            task: TaskView::from_task(task, &users),
            subtasks,
        }))
    }

    /// Applies a partial update to a task of `project_id`
    ///
    /// Returns `None` if the task does not exist in that project.
    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = data.to_sql();

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(project_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(attachments) = data.attachments {
            q = q.bind(Json(attachments));
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task and its subtasks atomically
    ///
    /// Subtasks go first, then the task. Returns `false` if the task does not
    /// exist in `project_id`; a second delete of the same task is therefore a
    /// clean `false`, not an error.
    pub async fn delete(pool: &PgPool, project_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let subtasks = sqlx::query(
            r#"
            DELETE FROM subtasks
            WHERE task_id IN (SELECT id FROM tasks WHERE id = $1 AND project_id = $2)
            "#,
        )
        .bind(id)
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;

        tracing::debug!(
            task_id = %id,
            subtasks = subtasks.rows_affected(),
            "Task deleted with its subtasks"
        );

        Ok(true)
    }

    /// Deletes every task of a project inside the project-delete transaction
    ///
    /// Subtasks must already be gone.
    pub async fn delete_by_project(
        tx: &mut Transaction<'_, Postgres>,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_defaults_to_to_do() {
        assert_eq!(TaskStatus::default(), TaskStatus::ToDo);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(TaskStatus::ToDo.as_str(), "to_do");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Done.as_str(), "done");
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"in_progress\"").unwrap(),
            TaskStatus::InProgress
        );
        assert!(serde_json::from_str::<TaskStatus>("\"blocked\"").is_err());
    }

    #[test]
    fn test_status_only_patch_touches_only_status() {
        let patch = UpdateTask {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };

        let sql = patch.to_sql();
        assert!(sql.starts_with("UPDATE tasks SET updated_at = NOW(), status = $3 WHERE"));
        assert!(!sql.contains("title ="));
        assert!(!sql.contains("description ="));
        assert!(!sql.contains("assigned_to ="));
        assert!(!sql.contains("attachments ="));
    }

    #[test]
    fn test_patch_binds_follow_field_order() {
        let patch = UpdateTask {
            title: Some("Ship".to_string()),
            assigned_to: Some(None),
            attachments: Some(vec![]),
            ..Default::default()
        };

        let sql = patch.to_sql();
        assert!(sql.contains(", title = $3, assigned_to = $4, attachments = $5 WHERE"));
        assert!(sql.contains("WHERE id = $1 AND project_id = $2"));
    }

    #[test]
    fn test_empty_patch() {
        let patch = UpdateTask::default();
        assert!(patch
            .to_sql()
            .starts_with("UPDATE tasks SET updated_at = NOW() WHERE"));

        let clearing = UpdateTask {
            description: Some(None),
            ..Default::default()
        };
        assert!(clearing.to_sql().contains(", description = $3 WHERE"));
    }

    #[test]
    fn test_view_resolves_users() {
        let assigner = UserSummary {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            full_name: None,
            avatar_url: None,
        };
        let assignee = UserSummary {
            id: Uuid::new_v4(),
            username: "dev".to_string(),
            full_name: Some("Dev Eloper".to_string()),
            avatar_url: None,
        };
        let task = Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Write docs".to_string(),
            description: None,
            assigned_to: Some(assignee.id),
            assigned_by: assigner.id,
            status: TaskStatus::ToDo,
            attachments: Json(vec![Attachment {
                url: "https://files.example.com/a.pdf".to_string(),
                mimetype: "application/pdf".to_string(),
                size: 2048,
            }]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(
            referenced_users(std::slice::from_ref(&task)).len(),
            2
        );

        let users: HashMap<Uuid, UserSummary> = [assigner.clone(), assignee.clone()]
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let view = TaskView::from_task(task, &users);

        assert_eq!(view.assigned_to, Some(assignee));
        assert_eq!(view.assigned_by, Some(assigner));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["assignedTo"]["username"], "dev");
        assert_eq!(json["assignedBy"]["username"], "admin");
        assert_eq!(json["status"], "to_do");
        assert_eq!(json["attachments"][0]["size"], 2048);
    }
}
