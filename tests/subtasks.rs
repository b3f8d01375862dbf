mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{spawn_app, str_field, TestApp};
use task_tracker::models::role::Role;

async fn task_for(app: &TestApp, admin: &str, assignee: &str) -> Result<String> {
    let (status, task) = app
        .request(
            "POST",
            "/api/tasks",
            Some(admin),
            Some(json!({ "title": "Cut the release", "assignedTo": assignee })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    Ok(str_field(&task, "id").to_string())
}

#[tokio::test]
async fn subtasks_start_open_and_can_be_checked_off() -> Result<()> {
    let app = spawn_app().await?;
    let (_, admin) = app.account("Grace", "Hopper", Role::Admin).await?;
    let task_id = task_for(&app, &admin, "Ada Lovelace").await?;
    let uri = format!("/api/tasks/{task_id}/subtasks");

    let (status, first) = app
        .request("POST", &uri, Some(&admin), Some(json!({ "title": " Tag the commit " })))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["title"], "Tag the commit");
    assert_eq!(first["completed"], false);
    assert_eq!(first["taskId"], task_id.as_str());

    let (_, second) = app
        .request("POST", &uri, Some(&admin), Some(json!({ "title": "Publish notes" })))
        .await?;

    let first_uri = format!("{uri}/{}", str_field(&first, "id"));
    let (status, done) = app
        .request("PUT", &first_uri, Some(&admin), Some(json!({ "completed": true })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(done["completed"], true);
    assert_eq!(done["title"], "Tag the commit");

    let (_, listed) = app.request("GET", &uri, Some(&admin), None).await?;
    let listed = listed.as_array().expect("array");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["completed"], true);
    assert_eq!(listed[1]["id"], second["id"]);
    assert_eq!(listed[1]["completed"], false);

    // A subtask needs a title
    let (status, body) = app.request("POST", &uri, Some(&admin), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "title");
    let (status, _) = app
        .request("PUT", &first_uri, Some(&admin), Some(json!({ "title": "  " })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request("DELETE", &first_uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request("DELETE", &first_uri, Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn assignees_read_subtasks_but_only_admins_change_them() -> Result<()> {
    let app = spawn_app().await?;
    let (_, admin) = app.account("Grace", "Hopper", Role::Admin).await?;
    let (_, ada) = app.account("Ada", "Lovelace", Role::User).await?;
    let (_, alan) = app.account("Alan", "Turing", Role::User).await?;
    let task_id = task_for(&app, &admin, "Ada Lovelace").await?;
    let uri = format!("/api/tasks/{task_id}/subtasks");

    let (_, subtask) = app
        .request("POST", &uri, Some(&admin), Some(json!({ "title": "Sign off" })))
        .await?;
    let subtask_uri = format!("{uri}/{}", str_field(&subtask, "id"));

    let (status, listed) = app.request("GET", &uri, Some(&ada), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    let (status, _) = app.request("GET", &uri, Some(&alan), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("POST", &uri, Some(&ada), Some(json!({ "title": "extra" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request("PUT", &subtask_uri, Some(&ada), Some(json!({ "completed": true })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request("DELETE", &subtask_uri, Some(&ada), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = app.request("GET", &uri, Some(&ada), None).await?;
    assert_eq!(listed[0]["completed"], false);

    Ok(())
}

#[tokio::test]
async fn subtasks_belong_to_their_task() -> Result<()> {
    let app = spawn_app().await?;
    let (_, admin) = app.account("Grace", "Hopper", Role::Owner).await?;
    let first = task_for(&app, &admin, "Ada Lovelace").await?;
    let second = task_for(&app, &admin, "Ada Lovelace").await?;

    let (_, subtask) = app
        .request(
            "POST",
            &format!("/api/tasks/{first}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "only on the first" })),
        )
        .await?;
    let subtask_id = str_field(&subtask, "id");

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/tasks/{second}/subtasks/{subtask_id}"),
            Some(&admin),
            Some(json!({ "completed": true })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request("DELETE", &format!("/api/tasks/{second}/subtasks/{subtask_id}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .request(
            "POST",
            &format!("/api/tasks/{missing}/subtasks"),
            Some(&admin),
            Some(json!({ "title": "orphan" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting the task takes its subtasks along
    let (status, _) = app
        .request("DELETE", &format!("/api/tasks/{first}"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task_subtasks").fetch_one(&app.pool).await?;
    assert_eq!(count, 0);

    Ok(())
}
