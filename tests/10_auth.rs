mod common;

use axum::http::{Method, StatusCode};
use common::{register, register_with, request, test_app, token, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn first_account_becomes_admin_of_new_organization() {
    let (app, _) = test_app();

    let session = register(&app, "alice@example.com", "Alice").await;
    assert_eq!(session["user"]["role"], "admin");
    assert_eq!(session["isFirstUser"], true);
    assert_eq!(session["tenant"]["name"], "Alice's Organization");

    let (status, me) = request(
        &app,
        Method::GET,
        "/api/auth/me",
        Some(token(&session)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "admin");
    assert_eq!(me["email"], "alice@example.com");
}

#[tokio::test]
async fn later_accounts_land_in_default_tenant_as_user() {
    let (app, _) = test_app();
    register(&app, "alice@example.com", "Alice").await;

    let session = register(&app, "bob@example.com", "Bob").await;
    assert_eq!(session["user"]["role"], "user");
    assert_eq!(session["isFirstUser"], false);
    assert_eq!(session["tenant"]["name"], "Default");
}

#[tokio::test]
async fn register_with_organization_name_grants_admin() {
    let (app, _) = test_app();
    register(&app, "alice@example.com", "Alice").await;

    let session = register_with(
        &app,
        json!({
            "email": "bob@acme.com",
            "password": PASSWORD,
            "name": "Bob",
            "organizationName": "Acme",
        }),
    )
    .await;
    assert_eq!(session["user"]["role"], "admin");
    assert_eq!(session["tenant"]["name"], "Acme");
}

#[tokio::test]
async fn register_with_tenant_key_joins_that_tenant() {
    let (app, _) = test_app();
    let admin = register(&app, "alice@example.com", "Alice").await;
    let key = common::tenant_key(&app, token(&admin)).await;

    let session = register_with(
        &app,
        json!({
            "email": "bob@example.com",
            "password": PASSWORD,
            "name": "Bob",
            "tenantKey": key,
        }),
    )
    .await;
    assert_eq!(session["user"]["role"], "user");
    assert_eq!(session["tenant"]["id"], admin["tenant"]["id"]);
}

#[tokio::test]
async fn register_with_bad_tenant_key_fails() {
    let (app, _) = test_app();
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "bob@example.com",
            "password": PASSWORD,
            "name": "Bob",
            "tenantKey": "no-such-key",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (app, _) = test_app();
    register(&app, "alice@example.com", "Alice").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": "Alice@Example.com",
            "password": PASSWORD,
            "name": "Alice Again",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (app, _) = test_app();
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "a@b.com", "password": "short", "name": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_round_trip() {
    let (app, _) = test_app();
    register(&app, "alice@example.com", "Alice").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["token"].as_str().is_some());
    // The password hash must never appear in any response
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let (app, _) = test_app();
    register(&app, "alice@example.com", "Alice").await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "not the password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_a_valid_token() {
    let (app, _) = test_app();

    let (status, _) = request(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        Method::GET,
        "/api/auth/me",
        Some("not.a.token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookies() {
    let (app, _) = test_app();
    let (status, body) = request(&app, Method::GET, "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");
}
