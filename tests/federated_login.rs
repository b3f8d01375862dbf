mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{header, StatusCode};
use serde_json::json;

use common::{spawn_app, spawn_app_with, TestApp, FRONTEND, PASSWORD};
use task_tracker::errors::AppError;
use task_tracker::models::role::Role;
use task_tracker::oauth::{FederatedIdentity, IdentityProvider};

/// Resolves codes of the form `<subject>:<email>` and refuses everything
/// else. Emails starting with `unverified` come back unverified.
struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> Result<String, AppError> {
        Ok(format!("https://idp.test/auth?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<FederatedIdentity, AppError> {
        let (subject, email) = code
            .split_once(':')
            .ok_or_else(|| AppError::upstream("token endpoint rejected the code"))?;
        Ok(FederatedIdentity {
            subject: subject.to_string(),
            email: email.to_string(),
            email_verified: !email.starts_with("unverified"),
            name: Some("Fed Erated User".to_string()),
            picture: Some("https://idp.test/avatar.png".to_string()),
        })
    }
}

async fn stub_app() -> Result<TestApp> {
    spawn_app_with(Some(Arc::new(StubProvider))).await
}

async fn callback_location(app: &TestApp, query: &str) -> Result<String> {
    let resp = app
        .raw("GET", &format!("/api/auth/google/callback{query}"), None, None)
        .await?;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()?
        .to_string();
    Ok(location)
}

fn token_from(location: &str) -> &str {
    location
        .strip_prefix(&format!("{FRONTEND}/?token="))
        .unwrap_or_else(|| panic!("no token in {location}"))
}

#[tokio::test]
async fn consent_redirect_points_at_the_provider() -> Result<()> {
    let app = stub_app().await?;

    let resp = app.raw("GET", "/api/auth/google", None, None).await?;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers().get(header::LOCATION).expect("location").to_str()?;
    assert!(location.starts_with("https://idp.test/auth?state="), "got {location}");

    Ok(())
}

#[tokio::test]
async fn callback_failures_land_on_the_login_page() -> Result<()> {
    let app = stub_app().await?;

    let location = callback_location(&app, "").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=auth_code_missing"));

    let location = callback_location(&app, "?code=").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=auth_code_missing"));

    let location = callback_location(&app, "?code=bad").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=auth_failed"));

    let location = callback_location(&app, "?code=sub-1:unverified@example.com").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=email_not_verified"));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&app.pool).await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn federation_can_be_disabled() -> Result<()> {
    let app = spawn_app().await?;

    let location = callback_location(&app, "?code=sub-1:ada@example.com").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=federation_disabled"));

    let resp = app.raw("GET", "/api/auth/google", None, None).await?;
    let location = resp.headers().get(header::LOCATION).expect("location").to_str()?;
    assert_eq!(location, format!("{FRONTEND}/login?error=federation_disabled"));

    Ok(())
}

#[tokio::test]
async fn first_federated_login_creates_a_passwordless_user() -> Result<()> {
    let app = stub_app().await?;

    let location = callback_location(&app, "?code=sub-42:New.Person@Example.com").await?;
    let token = token_from(&location).to_string();

    let (status, me) = app.request("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["email"], "new.person@example.com");
    assert_eq!(me["firstName"], "Fed");
    assert_eq!(me["lastName"], "Erated User");
    assert_eq!(me["role"], "user");
    assert_eq!(me["federatedId"], "sub-42");
    assert_eq!(me["hasPassword"], false);
    assert_eq!(me["profilePicture"], "https://idp.test/avatar.png");

    // A second login finds the same account
    let location = callback_location(&app, "?code=sub-42:new.person@example.com").await?;
    let token = token_from(&location).to_string();
    let (_, again) = app.request("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(again["id"], me["id"]);

    // No password to log in with
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "new.person@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "account uses federated sign-in");

    Ok(())
}

#[tokio::test]
async fn existing_password_account_gets_linked() -> Result<()> {
    let app = stub_app().await?;
    let (ada, _) = app.account("Ada", "Lovelace", Role::Admin).await?;

    let location = callback_location(&app, "?code=sub-7:Ada.Lovelace@example.com").await?;
    let token = token_from(&location).to_string();

    let (status, me) = app.request("GET", "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], ada.id.to_string());
    assert_eq!(me["federatedId"], "sub-7");
    assert_eq!(me["hasPassword"], true);
    // Linking keeps the stored names and role
    assert_eq!(me["firstName"], "Ada");
    assert_eq!(me["role"], "admin");

    // The password still works
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada.lovelace@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn provider_names_never_duplicate_a_display_name() -> Result<()> {
    let app = stub_app().await?;
    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "firstName": "Fed",
                "lastName": "Erated User",
                "email": "first.claim@example.com",
                "password": PASSWORD
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let location = callback_location(&app, "?code=sub-9:late.comer@example.com").await?;
    assert_eq!(location, format!("{FRONTEND}/login?error=auth_failed"));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&app.pool).await?;
    assert_eq!(count, 1);

    Ok(())
}
