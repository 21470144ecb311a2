/// Subtask model and database operations
///
/// Subtasks hang off a task and reach their project only through it, so
/// project-scoped lookups join `tasks`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subtasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     title VARCHAR(255) NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const SUBTASK_COLUMNS: &str = "id, task_id, title, is_completed, created_by, created_at, updated_at";

/// Same columns, qualified for queries joining `tasks`
const SUBTASK_COLUMNS_QUALIFIED: &str =
    "s.id, s.task_id, s.title, s.is_completed, s.created_by, s.created_at, s.updated_at";

/// Subtask row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subtask
#[derive(Debug, Clone)]
pub struct CreateSubtask {
    pub task_id: Uuid,

    /// Already trimmed and non-empty
    pub title: String,

    pub created_by: Uuid,
}

/// Partial subtask update
#[derive(Debug, Clone, Default)]
pub struct UpdateSubtask {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

impl Subtask {
    /// Creates an incomplete subtask
    pub async fn create(pool: &PgPool, data: CreateSubtask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO subtasks (task_id, title, created_by)
            VALUES ($1, $2, $3)
            RETURNING {SUBTASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(data.task_id)
            .bind(data.title)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a subtask whose parent task belongs to `project_id`
    pub async fn find_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {SUBTASK_COLUMNS_QUALIFIED}
            FROM subtasks s
            JOIN tasks t ON t.id = s.task_id
            WHERE s.id = $1 AND t.project_id = $2
            "#
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the subtasks of a task, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {SUBTASK_COLUMNS} FROM subtasks WHERE task_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, Subtask>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update to a subtask of `project_id`
    ///
    /// Returns `None` if no such subtask exists in that project.
    pub async fn update_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        data: UpdateSubtask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE subtasks s SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.is_completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_completed = ${}", bind_count));
        }

        query.push_str(&format!(
            " FROM tasks t WHERE s.id = $1 AND t.id = s.task_id AND t.project_id = $2 \
             RETURNING {SUBTASK_COLUMNS_QUALIFIED}"
        ));

        let mut q = sqlx::query_as::<_, Subtask>(&query).bind(id).bind(project_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(is_completed) = data.is_completed {
            q = q.bind(is_completed);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a subtask of `project_id`; `false` if it was not found
    pub async fn delete_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM subtasks s
            USING tasks t
            WHERE s.id = $1 AND t.id = s.task_id AND t.project_id = $2
            "#,
        )
        .bind(id)
        .bind(project_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every subtask under the tasks of a project
    pub async fn delete_by_project(
        tx: &mut Transaction<'_, Postgres>,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM subtasks
            WHERE task_id IN (SELECT id FROM tasks WHERE project_id = $1)
            "#,
        )
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
