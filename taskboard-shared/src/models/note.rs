/// Project notes
///
/// Free-text notes attached to a project. Reads are open to every member;
/// writes are restricted by the capability table in
/// [`crate::auth::authorization`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::user::UserSummary;

const NOTE_COLUMNS: &str = "id, project_id, created_by, content, created_at, updated_at";

/// Note row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNote {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note with its author resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Option<UserSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteView {
    fn new(note: ProjectNote, author: Option<UserSummary>) -> Self {
        Self {
            id: note.id,
            project_id: note.project_id,
            created_by: author,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl ProjectNote {
    /// Creates a note
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        created_by: Uuid,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO project_notes (project_id, created_by, content)
            VALUES ($1, $2, $3)
            RETURNING {NOTE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ProjectNote>(&query)
            .bind(project_id)
            .bind(created_by)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    /// Lists the notes of a project with their authors, newest first
    pub async fn list_views(pool: &PgPool, project_id: Uuid) -> Result<Vec<NoteView>, sqlx::Error> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM project_notes WHERE project_id = $1 ORDER BY created_at DESC"
        );

        let notes = sqlx::query_as::<_, ProjectNote>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;

        let mut authors: Vec<Uuid> = notes.iter().map(|n| n.created_by).collect();
        authors.sort_unstable();
        authors.dedup();
        let users = UserSummary::find_by_ids(pool, &authors).await?;

        Ok(notes
            .into_iter()
            .map(|note| {
                let author = users.get(&note.created_by).cloned();
                NoteView::new(note, author)
            })
            .collect())
    }

    /// Finds a note of `project_id` with its author
    pub async fn find_view(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<NoteView>, sqlx::Error> {
        let query = format!(
            "SELECT {NOTE_COLUMNS} FROM project_notes WHERE id = $1 AND project_id = $2"
        );

        let Some(note) = sqlx::query_as::<_, ProjectNote>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let mut users = UserSummary::find_by_ids(pool, &[note.created_by]).await?;
        let author = users.remove(&note.created_by);

        Ok(Some(NoteView::new(note, author)))
    }

    /// Replaces the content of a note; `None` if not found in `project_id`
    pub async fn update_content(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        content: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE project_notes
            SET content = $3, updated_at = NOW()
            WHERE id = $1 AND project_id = $2
            RETURNING {NOTE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ProjectNote>(&query)
            .bind(id)
            .bind(project_id)
            .bind(content)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a note of `project_id`; `false` if it was not found
    pub async fn delete_in_project(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_notes WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every note of a project inside the project-delete transaction
    pub async fn delete_by_project(
        tx: &mut Transaction<'_, Postgres>,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_notes WHERE project_id = $1")
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
    fn test_view_carries_author_summary() {
        let author = UserSummary {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            full_name: Some("Alice".to_string()),
            avatar_url: None,
        };
        let note = ProjectNote {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            created_by: author.id,
            content: "Release on Friday".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(NoteView::new(note, Some(author))).unwrap();
        assert_eq!(json["content"], "Release on Friday");
        assert_eq!(json["createdBy"]["username"], "alice");
        assert!(json.get("projectId").is_some());
    }
}
