/// End-to-end project, task and membership flows
///
/// These tests need PostgreSQL (`TEST_DATABASE_URL` or `DATABASE_URL`):
///
/// ```bash
/// TEST_DATABASE_URL=postgres://localhost/taskboard_test cargo test -- --ignored
/// ```

mod common;

use axum::http::StatusCode;
use common::{project_name, TestContext, TestUser};
use serde_json::{json, Value};
use taskboard_shared::auth::authorization::ProjectAction;
use taskboard_shared::models::project_member::ProjectRole;

async fn create_project(ctx: &TestContext, owner: &TestUser) -> String {
    let (status, body) = ctx
        .call(
            "POST",
            "/api/v1/projects",
            Some(owner),
            Some(json!({ "name": project_name("Launch"), "description": "Q3" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["role"], "admin");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn add_member(ctx: &TestContext, admin: &TestUser, project: &str, user: &TestUser, role: &str) {
    let (status, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/projects/{project}/members"),
            Some(admin),
            Some(json!({ "email": user.email, "role": role })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

async fn create_task(ctx: &TestContext, user: &TestUser, project: &str, body: Value) -> (StatusCode, Value) {
    ctx.call("POST", &format!("/api/v1/tasks/{project}"), Some(user), Some(body))
        .await
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_task_lifecycle_scenario() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("admin").await.unwrap();
    let member = ctx.create_user("member").await.unwrap();

    let project = create_project(&ctx, &admin).await;
    add_member(&ctx, &admin, &project, &member, "member").await;

    // Status defaults to to_do, assigner is the caller
    let (status, body) = create_task(
        &ctx,
        &admin,
        &project,
        json!({ "title": "  Ship it ", "assignedTo": member.id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "Ship it");
    assert_eq!(body["data"]["status"], "to_do");
    assert_eq!(body["data"]["assignedBy"], admin.id.to_string());
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "Fix bug" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isCompleted"], false);
    let subtask = body["data"]["id"].as_str().unwrap().to_string();

    // Members read the task with user summaries and subtasks
    let (status, body) = ctx
        .call("GET", &format!("/api/v1/tasks/{project}/t/{task}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assignedTo"]["id"], member.id.to_string());
    assert_eq!(body["data"]["assignedBy"]["id"], admin.id.to_string());
    assert_eq!(body["data"]["subtasks"].as_array().unwrap().len(), 1);

    // Members may complete subtasks but not delete tasks
    let (status, body) = ctx
        .call(
            "PUT",
            &format!("/api/v1/tasks/{project}/st/{subtask}"),
            Some(&member),
            Some(json!({ "isCompleted": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCompleted"], true);
    assert_eq!(body["data"]["title"], "Fix bug");

    let (status, body) = ctx
        .call("DELETE", &format!("/api/v1/tasks/{project}/t/{task}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "You do not have permission to perform this action"
    );

    // Deleting cascades to subtasks; deleting again is 404
    let (status, _) = ctx
        .call("DELETE", &format!("/api/v1/tasks/{project}/t/{task}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx
        .call("GET", &format!("/api/v1/tasks/{project}/st/{subtask}"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .call("DELETE", &format!("/api/v1/tasks/{project}/t/{task}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_non_member_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("owner").await.unwrap();
    let outsider = ctx.create_user("outsider").await.unwrap();

    let project = create_project(&ctx, &admin).await;

    for (method, uri) in [
        ("GET", format!("/api/v1/projects/{project}")),
        ("GET", format!("/api/v1/projects/{project}/members")),
        ("GET", format!("/api/v1/tasks/{project}")),
        ("GET", format!("/api/v1/notes/{project}")),
    ] {
        let (status, body) = ctx.call(method, &uri, Some(&outsider), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(body["message"], "You don't have access to this project");
        assert_eq!(body["success"], false);
    }

    let (status, _) = ctx
        .call("GET", &format!("/api/v1/projects/{}", uuid::Uuid::new_v4()), Some(&outsider), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_route_permission_matrix() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("admin").await.unwrap();
    let lead = ctx.create_user("lead").await.unwrap();
    let member = ctx.create_user("member").await.unwrap();
    let outsider = ctx.create_user("outsider").await.unwrap();
    let bystander = ctx.create_user("bystander").await.unwrap();

    let project = create_project(&ctx, &admin).await;
    add_member(&ctx, &admin, &project, &lead, "project_admin").await;
    add_member(&ctx, &admin, &project, &member, "member").await;
    add_member(&ctx, &admin, &project, &bystander, "member").await;

    let (_, body) = create_task(&ctx, &admin, &project, json!({ "title": "Matrix" })).await;
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "Step" })),
        )
        .await;
    let subtask = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/notes/{project}"),
            Some(&admin),
            Some(json!({ "content": "Agenda" })),
        )
        .await;
    let note = body["data"]["id"].as_str().unwrap().to_string();

    let other = bystander.id;
    let routes: Vec<(&str, String, ProjectAction, Option<Value>)> = vec![
        ("GET", format!("/api/v1/projects/{project}"), ProjectAction::ViewProject, None),
        (
            "PUT",
            format!("/api/v1/projects/{project}"),
            ProjectAction::UpdateProject,
            Some(json!({ "description": "Updated" })),
        ),
        ("GET", format!("/api/v1/projects/{project}/members"), ProjectAction::ListMembers, None),
        (
            "POST",
            format!("/api/v1/projects/{project}/members"),
            ProjectAction::AddMember,
            Some(json!({ "email": bystander.email, "role": "member" })),
        ),
        (
            "PUT",
            format!("/api/v1/projects/{project}/members/{other}"),
            ProjectAction::UpdateMemberRole,
            Some(json!({ "role": "member" })),
        ),
        ("GET", format!("/api/v1/tasks/{project}"), ProjectAction::ListTasks, None),
        (
            "POST",
            format!("/api/v1/tasks/{project}"),
            ProjectAction::CreateTask,
            Some(json!({ "title": "Another" })),
        ),
        ("GET", format!("/api/v1/tasks/{project}/t/{task}"), ProjectAction::ViewTask, None),
        (
            "PUT",
            format!("/api/v1/tasks/{project}/t/{task}"),
            ProjectAction::UpdateTask,
            Some(json!({ "status": "in_progress" })),
        ),
        (
            "POST",
            format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            ProjectAction::CreateSubtask,
            Some(json!({ "title": "Extra step" })),
        ),
        ("GET", format!("/api/v1/tasks/{project}/st/{subtask}"), ProjectAction::ViewSubtask, None),
        (
            "PUT",
            format!("/api/v1/tasks/{project}/st/{subtask}"),
            ProjectAction::UpdateSubtask,
            Some(json!({ "isCompleted": true })),
        ),
        ("GET", format!("/api/v1/notes/{project}"), ProjectAction::ListNotes, None),
        (
            "POST",
            format!("/api/v1/notes/{project}"),
            ProjectAction::CreateNote,
            Some(json!({ "content": "Minutes" })),
        ),
        ("GET", format!("/api/v1/notes/{project}/n/{note}"), ProjectAction::ViewNote, None),
        (
            "PUT",
            format!("/api/v1/notes/{project}/n/{note}"),
            ProjectAction::UpdateNote,
            Some(json!({ "content": "Edited" })),
        ),
        // Destructive routes last; a later caller may then see 404
        ("DELETE", format!("/api/v1/tasks/{project}/st/{subtask}"), ProjectAction::DeleteSubtask, None),
        ("DELETE", format!("/api/v1/notes/{project}/n/{note}"), ProjectAction::DeleteNote, None),
        (
            "DELETE",
            format!("/api/v1/projects/{project}/members/{other}"),
            ProjectAction::RemoveMember,
            None,
        ),
        ("DELETE", format!("/api/v1/tasks/{project}/t/{task}"), ProjectAction::DeleteTask, None),
        ("DELETE", format!("/api/v1/projects/{project}"), ProjectAction::DeleteProject, None),
    ];

    // Every action is reached by exactly one route
    for action in ProjectAction::ALL {
        assert_eq!(
            routes.iter().filter(|(_, _, a, _)| *a == action).count(),
            1,
            "{action:?}"
        );
    }

    let callers = [
        (&outsider, None),
        (&member, Some(ProjectRole::Member)),
        (&lead, Some(ProjectRole::ProjectAdmin)),
        (&admin, Some(ProjectRole::Admin)),
    ];

    for (method, uri, action, body) in &routes {
        for (user, role) in &callers {
            let (status, reply) = ctx.call(method, uri, Some(*user), body.clone()).await;

            match role {
                None => {
                    assert_eq!(status, StatusCode::FORBIDDEN, "outsider {method} {uri}");
                    assert_eq!(reply["message"], "You don't have access to this project");
                }
                Some(role) if action.permits(*role) => {
                    assert!(
                        status.is_success() || status == StatusCode::NOT_FOUND,
                        "{role:?} {method} {uri}: {status} {reply}"
                    );
                }
                Some(role) => {
                    assert_eq!(status, StatusCode::FORBIDDEN, "{role:?} {method} {uri}");
                    assert_eq!(
                        reply["message"],
                        "You do not have permission to perform this action"
                    );
                }
            }
        }
    }

    // The last admin call deleted the project
    let (status, _) = ctx
        .call("GET", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_removed_member_is_unassigned() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("owner").await.unwrap();
    let member = ctx.create_user("leaver").await.unwrap();

    let project = create_project(&ctx, &admin).await;
    add_member(&ctx, &admin, &project, &member, "member").await;

    let (_, body) = create_task(
        &ctx,
        &admin,
        &project,
        json!({ "title": "Handover", "assignedTo": member.id }),
    )
    .await;
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .call(
            "DELETE",
            &format!("/api/v1/projects/{project}/members/{}", member.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .call("GET", &format!("/api/v1/tasks/{project}/t/{task}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["assignedTo"].is_null(), "{body}");

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_partial_task_update() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("patcher").await.unwrap();
    let project = create_project(&ctx, &admin).await;

    let (_, body) = create_task(
        &ctx,
        &admin,
        &project,
        json!({ "title": "Draft", "description": "First pass" }),
    )
    .await;
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call(
            "PUT",
            &format!("/api/v1/tasks/{project}/t/{task}"),
            Some(&admin),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["title"], "Draft");
    assert_eq!(body["data"]["description"], "First pass");

    let (_, body) = ctx
        .call(
            "PUT",
            &format!("/api/v1/tasks/{project}/t/{task}"),
            Some(&admin),
            Some(json!({ "description": null })),
        )
        .await;
    assert!(body["data"]["description"].is_null());
    assert_eq!(body["data"]["status"], "in_progress");

    // Assignee must belong to the project
    let stranger = ctx.create_user("stranger").await.unwrap();
    let (status, _) = ctx
        .call(
            "PUT",
            &format!("/api/v1/tasks/{project}/t/{task}"),
            Some(&admin),
            Some(json!({ "assignedTo": stranger.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_subtask_title_validation() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("lead").await.unwrap();
    let project = create_project(&ctx, &admin).await;

    let (_, body) = create_task(&ctx, &admin, &project, json!({ "title": "Parent" })).await;
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "title");

    // Longer than the column allows
    let long = "x".repeat(300);
    let (status, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            Some(&admin),
            Some(json!({ "title": long })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["errors"][0]["field"], "title");

    let (_, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/tasks/{project}/t/{task}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "Short" })),
        )
        .await;
    let subtask = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = ctx
        .call(
            "PUT",
            &format!("/api/v1/tasks/{project}/st/{subtask}"),
            Some(&admin),
            Some(json!({ "title": long })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_project_keeps_an_admin() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("solo").await.unwrap();
    let helper = ctx.create_user("helper").await.unwrap();
    let project = create_project(&ctx, &admin).await;

    let (status, body) = ctx
        .call(
            "PUT",
            &format!("/api/v1/projects/{project}/members/{}", admin.id),
            Some(&admin),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A project must keep at least one admin");

    let (status, _) = ctx
        .call(
            "DELETE",
            &format!("/api/v1/projects/{project}/members/{}", admin.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // With a second admin the first may step down
    add_member(&ctx, &admin, &project, &helper, "admin").await;
    let (status, body) = ctx
        .call(
            "PUT",
            &format!("/api/v1/projects/{project}/members/{}", admin.id),
            Some(&admin),
            Some(json!({ "role": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "member");

    let (status, _) = ctx
        .call(
            "DELETE",
            &format!("/api/v1/projects/{project}/members/{}", uuid::Uuid::new_v4()),
            Some(&helper),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&helper), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_notes_are_admin_written() {
    let ctx = TestContext::new().await.unwrap();
    let admin = ctx.create_user("scribe").await.unwrap();
    let pm = ctx.create_user("pm").await.unwrap();
    let project = create_project(&ctx, &admin).await;
    add_member(&ctx, &admin, &project, &pm, "project_admin").await;

    let (status, _) = ctx
        .call(
            "POST",
            &format!("/api/v1/notes/{project}"),
            Some(&pm),
            Some(json!({ "content": "Kickoff Monday" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .call(
            "POST",
            &format!("/api/v1/notes/{project}"),
            Some(&admin),
            Some(json!({ "content": "Kickoff Monday" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let note = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .call("GET", &format!("/api/v1/notes/{project}/n/{note}"), Some(&pm), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "Kickoff Monday");
    assert_eq!(body["data"]["createdBy"]["id"], admin.id.to_string());

    ctx.call("DELETE", &format!("/api/v1/projects/{project}"), Some(&admin), None)
        .await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_account_flow() {
    let ctx = TestContext::new().await.unwrap();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let username = format!("ada_{}", &suffix[..10]);
    let email = format!("{username}@example.com");

    let (status, body) = ctx
        .call(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "username": username, "password": "Secure123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user"]["isEmailVerified"], false);
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // Duplicate registration
    let (status, _) = ctx
        .call(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": email, "username": username, "password": "Secure123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Follow the mailed verification link
    let mails = ctx.mailer.sent().await;
    let mail = mails.iter().rev().find(|m| m.to == email).unwrap();
    let link = mail
        .body
        .lines()
        .find(|line| line.contains("/verify-email/"))
        .unwrap()
        .trim();
    let path = link.trim_start_matches(ctx.config.api.server_url.as_str());

    let (status, _) = ctx.call("GET", path, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.call("GET", path, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .call(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "Wrong1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .call(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "Secure123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    // Rotation: the first refresh works, replaying it does not
    let (status, body) = ctx
        .call(
            "POST",
            "/api/v1/auth/refresh-token",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].is_string());

    let (status, _) = ctx
        .call(
            "POST",
            "/api/v1/auth/refresh-token",
            None,
            Some(json!({ "refreshToken": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
