mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{spawn_app, str_field};
use task_tracker::jwt::JwtConfig;
use task_tracker::models::role::Role;

#[tokio::test]
async fn registration_and_login() -> Result<()> {
    let app = spawn_app().await?;

    // 1. Register with short password
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "firstName": "Short",
                "lastName": "Pass",
                "email": "short@example.com",
                "password": "short"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "short password must be rejected: {body}");
    assert_eq!(body["errors"][0]["field"], "password");

    // 2. Register with valid user
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "firstName": "Valid",
                "lastName": "User",
                "email": "Valid@Example.com",
                "password": "password123"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["email"], "valid@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    let token = str_field(&body, "token").to_string();

    // 3. Same email in a different case is a duplicate
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "firstName": "Again",
                "lastName": "User",
                "email": "VALID@example.com",
                "password": "password123"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // 4. Login with wrong password
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "valid@example.com", "password": "wrongpassword" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "wrong password: {body}");
    assert_eq!(body["message"], "invalid email or password");

    // 5. Login with non-existent email gets the same answer
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "password123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid email or password");

    // 6. Successful login and /me
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "valid@example.com", "password": "password123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["user"]["firstName"], "Valid");

    let (status, me) = app.request("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "valid@example.com");
    assert_eq!(me["hasPassword"], true);

    Ok(())
}

#[tokio::test]
async fn missing_and_invalid_tokens_are_told_apart() -> Result<()> {
    let app = spawn_app().await?;

    // No credential at all
    let (status, body) = app.request("GET", "/api/tasks", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    // Garbage credential
    let (status, body) = app.request("GET", "/api/tasks", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // Signed with a different secret
    let (user, _) = app.account("Eve", "Mallory", Role::Owner).await?;
    let forged = JwtConfig::new("other-secret", 1).encode(&user)?;
    let (status, _) = app.request("GET", "/api/tasks", Some(&forged), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Expired
    let expired = JwtConfig::new("test-secret", -2).encode(&user)?;
    let (status, _) = app.request("GET", "/api/auth/me", Some(&expired), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn malformed_bodies_name_the_field() -> Result<()> {
    let app = spawn_app().await?;
    let (_, token) = app.account("Ada", "Lovelace", Role::Admin).await?;

    let (status, body) = app
        .request(
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "title": "Broken", "status": "finished" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert_eq!(body["errors"][0]["field"], "status");

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "firstName": "A", "lastName": "B", "email": "not-an-email", "password": "password123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "email");

    Ok(())
}

#[tokio::test]
async fn missing_fields_and_bad_ids_come_back_as_json() -> Result<()> {
    let app = spawn_app().await?;
    let (_, token) = app.account("Ada", "Lovelace", Role::Admin).await?;

    let (status, body) = app
        .request("POST", "/api/tasks", Some(&token), Some(json!({ "description": "no title" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "title");

    for uri in ["/api/tasks/not-a-uuid", "/api/users/42", "/api/tasks/not-a-uuid/notes"] {
        let (status, body) = app.request("GET", uri, Some(&token), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation", "{uri}: {body}");
        assert!(!body["errors"][0]["message"].as_str().unwrap_or_default().is_empty());
    }

    Ok(())
}
