/// Per-project authorization
///
/// Every project-scoped operation is named by a [`ProjectAction`]. Each action
/// lists the roles allowed to perform it; roles do not inherit from one
/// another, so the table below is the whole policy.
///
/// | Action                                   | admin | project_admin | member |
/// |------------------------------------------|:-----:|:-------------:|:------:|
/// | view project, list members               |   ✓   |       ✓       |   ✓    |
/// | list/view tasks, view/update subtasks    |   ✓   |       ✓       |   ✓    |
/// | list/view notes                          |   ✓   |       ✓       |   ✓    |
/// | create/update/delete task                |   ✓   |       ✓       |        |
/// | create/delete subtask                    |   ✓   |       ✓       |        |
/// | update/delete project                    |   ✓   |               |        |
/// | add/update/remove member                 |   ✓   |               |        |
/// | create/update/delete note                |   ✓   |               |        |
///
/// # Outcomes
///
/// - No membership row: [`AuthzError::NoAccess`] (403, "You don't have
///   access to this project")
/// - A role outside the action's set: [`AuthzError::InsufficientRole`]
///   (403, "You do not have permission to perform this action")
///
/// Whether the project itself exists is not looked at; a nonexistent
/// project has no members and therefore reads as "no access".
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{check_permission, ProjectAction};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let access = check_permission(&pool, user_id, project_id, ProjectAction::CreateTask).await?;
/// assert_eq!(access.project_id, project_id);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project_member::{ProjectMember, ProjectRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller is not a member of the project
    #[error("You don't have access to this project")]
    NoAccess(Uuid),

    /// Caller is a member but their role does not permit the action
    #[error("You do not have permission to perform this action")]
    InsufficientRole {
        action: ProjectAction,
        role: ProjectRole,
    },

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// A project-scoped operation subject to the capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectAction {
    ViewProject,
    UpdateProject,
    DeleteProject,
    ListMembers,
    AddMember,
    UpdateMemberRole,
    RemoveMember,
    ListTasks,
    ViewTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
    ViewSubtask,
    CreateSubtask,
    UpdateSubtask,
    DeleteSubtask,
    ListNotes,
    ViewNote,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

const EVERY_ROLE: &[ProjectRole] = &[
    ProjectRole::Admin,
    ProjectRole::ProjectAdmin,
    ProjectRole::Member,
];
const MANAGERS: &[ProjectRole] = &[ProjectRole::Admin, ProjectRole::ProjectAdmin];
const ADMIN_ONLY: &[ProjectRole] = &[ProjectRole::Admin];

impl ProjectAction {
    /// Every action, in declaration order
    pub const ALL: [ProjectAction; 21] = [
        ProjectAction::ViewProject,
        ProjectAction::UpdateProject,
        ProjectAction::DeleteProject,
        ProjectAction::ListMembers,
        ProjectAction::AddMember,
        ProjectAction::UpdateMemberRole,
        ProjectAction::RemoveMember,
        ProjectAction::ListTasks,
        ProjectAction::ViewTask,
        ProjectAction::CreateTask,
        ProjectAction::UpdateTask,
        ProjectAction::DeleteTask,
        ProjectAction::ViewSubtask,
        ProjectAction::CreateSubtask,
        ProjectAction::UpdateSubtask,
        ProjectAction::DeleteSubtask,
        ProjectAction::ListNotes,
        ProjectAction::ViewNote,
        ProjectAction::CreateNote,
        ProjectAction::UpdateNote,
        ProjectAction::DeleteNote,
    ];

    /// Roles allowed to perform this action
    pub fn allowed_roles(&self) -> &'static [ProjectRole] {
        use ProjectAction::*;

        match self {
            ViewProject | ListMembers | ListTasks | ViewTask | ViewSubtask | UpdateSubtask
            | ListNotes | ViewNote => EVERY_ROLE,

            CreateTask | UpdateTask | DeleteTask | CreateSubtask | DeleteSubtask => MANAGERS,

            UpdateProject | DeleteProject | AddMember | UpdateMemberRole | RemoveMember
            | CreateNote | UpdateNote | DeleteNote => ADMIN_ONLY,
        }
    }

    /// Whether `role` may perform this action
    pub fn permits(&self, role: ProjectRole) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Result of a successful permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub user_id: Uuid,

    /// Caller's role in the project
    pub role: ProjectRole,
}

/// Applies the capability table to an already-loaded membership
///
/// `role` is `None` when the caller has no membership in `project_id`.
pub fn authorize(
    role: Option<ProjectRole>,
    project_id: Uuid,
    action: ProjectAction,
) -> Result<ProjectRole, AuthzError> {
    let role = role.ok_or(AuthzError::NoAccess(project_id))?;

    if !action.permits(role) {
        return Err(AuthzError::InsufficientRole { action, role });
    }

    Ok(role)
}

/// Loads the caller's membership and checks it against the table
///
/// # Errors
///
/// - [`AuthzError::NoAccess`] if `user_id` is not a member of `project_id`
/// - [`AuthzError::InsufficientRole`] if the member's role is not allowed
/// - [`AuthzError::DatabaseError`] if the lookup fails
pub async fn check_permission(
    pool: &PgPool,
    user_id: Uuid,
    project_id: Uuid,
    action: ProjectAction,
) -> Result<ProjectAccess, AuthzError> {
    let membership = ProjectMember::get_role(pool, project_id, user_id).await?;

    let role = authorize(membership, project_id, action).map_err(|e| {
        tracing::debug!(
            user_id = %user_id,
            project_id = %project_id,
            action = ?action,
            error = %e,
            "Project permission denied"
        );
        e
    })?;

    Ok(ProjectAccess {
        project_id,
        user_id,
        role,
    })
}
