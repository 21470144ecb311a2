/// Project membership model and database operations
///
/// A membership binds a user to a project with a [`ProjectRole`]. Roles are a
/// flat set: there is no ordering between them, every project operation lists
/// the roles it accepts (see `auth::authorization`).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'project_admin', 'member');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Admin invariant
///
/// A project always keeps at least one `admin`. Every mutation that can drop
/// an admin (re-adding with a lower role, changing a role, removing) runs in a
/// transaction that first locks all membership rows of the project with
/// `SELECT ... FOR UPDATE`, so two concurrent demotions cannot both pass the
/// check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::user::UserSummary;

/// Role of a user within one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Manages the project, its members and notes
    Admin,

    /// Manages tasks and subtasks
    ProjectAdmin,

    /// Reads the project, updates subtasks
    Member,
}

impl ProjectRole {
    /// Every role, in declaration order
    pub const ALL: [ProjectRole; 3] = [
        ProjectRole::Admin,
        ProjectRole::ProjectAdmin,
        ProjectRole::Member,
    ];

    /// Converts role to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::ProjectAdmin => "project_admin",
            ProjectRole::Member => "member",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from membership mutations
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// No membership row for the (project, user) pair
    #[error("Project member not found")]
    NotFound,

    /// The change would leave the project without an admin
    #[error("A project must keep at least one admin")]
    LastAdmin,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member listing entry: the user summary plus the role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: UserSummary,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    role: ProjectRole,
    created_at: DateTime<Utc>,
}

impl From<MemberRow> for MemberView {
    fn from(row: MemberRow) -> Self {
        Self {
            user: UserSummary {
                id: row.id,
                username: row.username,
                full_name: row.full_name,
                avatar_url: row.avatar_url,
            },
            role: row.role,
            joined_at: row.created_at,
        }
    }
}

/// Checks that assigning `new_role` to `target` (or removing it, when `None`)
/// leaves at least one admin among `members`
///
/// `members` is the full current membership of the project as
/// `(user_id, role)` pairs.
pub fn ensure_admin_remains(
    members: &[(Uuid, ProjectRole)],
    target: Uuid,
    new_role: Option<ProjectRole>,
) -> Result<(), MembershipError> {
    let admins_after = members
        .iter()
        .map(|&(user_id, role)| if user_id == target { new_role } else { Some(role) })
        .filter(|role| *role == Some(ProjectRole::Admin))
        .count();

    let admins_before = members
        .iter()
        .filter(|(_, role)| *role == ProjectRole::Admin)
        .count();

    // A project that already has no admin is left as is.
    if admins_before > 0 && admins_after == 0 {
        return Err(MembershipError::LastAdmin);
    }

    Ok(())
}

/// Locks and returns every membership of a project
async fn lock_members(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Uuid,
) -> Result<Vec<(Uuid, ProjectRole)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, ProjectRole)>(
        r#"
        SELECT user_id, role
        FROM project_members
        WHERE project_id = $1
        FOR UPDATE
        "#,
    )
    .bind(project_id)
    .fetch_all(&mut **tx)
    .await
}

impl ProjectMember {
    /// Inserts a membership inside an existing transaction
    ///
    /// Used when a project is created and its creator becomes admin.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut **tx)
        .await
    }

    /// Gets the role of `user_id` in `project_id`, `None` if not a member
    pub async fn get_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, sqlx::Error> {
        sqlx::query_scalar::<_, ProjectRole>(
            r#"
            SELECT role FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the members of a project with their user summaries
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<MemberView>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id, u.username, u.full_name, u.avatar_url, m.role, m.created_at
            FROM project_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(MemberView::from).collect())
    }

    /// Adds a member, or changes the role of an existing one
    ///
    /// # Errors
    ///
    /// `LastAdmin` when the user is the only admin and `role` is not admin.
    pub async fn upsert(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, MembershipError> {
        let mut tx = pool.begin().await?;

        let members = lock_members(&mut tx, project_id).await?;
        ensure_admin_remains(&members, user_id, Some(role))?;

        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Changes the role of an existing member
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user is not a member
    /// - `LastAdmin` if this demotes the only admin
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, MembershipError> {
        let mut tx = pool.begin().await?;

        let members = lock_members(&mut tx, project_id).await?;
        if !members.iter().any(|(id, _)| *id == user_id) {
            return Err(MembershipError::NotFound);
        }
        ensure_admin_remains(&members, user_id, Some(role))?;

        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3, updated_at = NOW()
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Removes a member from a project
    ///
    /// Tasks of the project assigned to the member become unassigned in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user is not a member
    /// - `LastAdmin` if the user is the only admin
    pub async fn remove(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), MembershipError> {
        let mut tx = pool.begin().await?;

        let members = lock_members(&mut tx, project_id).await?;
        if !members.iter().any(|(id, _)| *id == user_id) {
            return Err(MembershipError::NotFound);
        }
        ensure_admin_remains(&members, user_id, None)?;

        sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let unassigned = sqlx::query(
            "UPDATE tasks SET assigned_to = NULL, updated_at = NOW() WHERE project_id = $1 AND assigned_to = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            %project_id,
            %user_id,
            unassigned = unassigned.rows_affected(),
            "Member removed"
        );
        Ok(())
    }

    /// Deletes every membership of a project inside the project-delete transaction
    pub async fn delete_by_project(
        tx: &mut Transaction<'_, Postgres>,
        project_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}
