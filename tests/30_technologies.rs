mod common;

use axum::http::{Method, StatusCode};
use common::{register, register_with, request, test_app, token, PASSWORD};
use serde_json::{json, Value};

fn postgres_draft() -> Value {
    json!({
        "name": "PostgreSQL",
        "description": "Relational database",
        "vendor": "PostgreSQL Global Development Group",
        "capability": "Data storage",
        "lifecycleStatus": "Active",
        "startDate": "1996-09-01",
        "versions": [
            { "versionNumber": "15", "releaseDate": "2022-10-13" },
            { "versionNumber": "16", "releaseDate": "2023-09-14" }
        ],
        "currentVersion": "16"
    })
}

async fn create_technology(app: &axum::Router, token: &str, draft: Value) -> Value {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/technologies",
        Some(token),
        Some(draft),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

#[tokio::test]
async fn admin_crud_round_trip() {
    let (app, _) = test_app();
    let admin = register(&app, "alice@example.com", "Alice").await;

    let tech = create_technology(&app, token(&admin), postgres_draft()).await;
    let id = tech["id"].as_str().unwrap();
    assert_eq!(tech["currentVersion"], "16");
    assert_eq!(tech["createdBy"], admin["user"]["id"]);

    let (status, fetched) = request(
        &app,
        Method::GET,
        &format!("/api/technologies/{id}"),
        Some(token(&admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "PostgreSQL");

    let (status, updated) = request(
        &app,
        Method::PUT,
        &format!("/api/technologies/{id}"),
        Some(token(&admin)),
        Some(json!({ "description": "RDBMS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "RDBMS");
    assert_eq!(updated["name"], "PostgreSQL");

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/technologies/{id}"),
        Some(token(&admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/api/technologies/{id}"),
        Some(token(&admin)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutation_requires_tenant_admin() {
    let (app, _) = test_app();
    let admin = register(&app, "alice@example.com", "Alice").await;
    let key = common::tenant_key(&app, token(&admin)).await;
    let member = register_with(
        &app,
        json!({
            "email": "bob@example.com",
            "password": PASSWORD,
            "name": "Bob",
            "tenantKey": key,
        }),
    )
    .await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/technologies",
        Some(token(&member)),
        Some(postgres_draft()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reads are open to any member
    let (status, _) = request(
        &app,
        Method::GET,
        "/api/technologies",
        Some(token(&member)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn records_are_invisible_across_tenants() {
    let (app, _) = test_app();
    let alice = register(&app, "alice@example.com", "Alice").await;
    let bob = register_with(
        &app,
        json!({
            "email": "bob@example.com",
            "password": PASSWORD,
            "name": "Bob",
            "organizationName": "Bobs Org",
        }),
    )
    .await;

    // Same name in both tenants is fine
    let tech_a = create_technology(&app, token(&alice), postgres_draft()).await;
    create_technology(&app, token(&bob), postgres_draft()).await;

    let id_a = tech_a["id"].as_str().unwrap();
    let (status, _) = request(
        &app,
        Method::GET,
        &format!("/api/technologies/{id_a}"),
        Some(token(&bob)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/technologies/{id_a}"),
        Some(token(&bob)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = request(
        &app,
        Method::GET,
        "/api/technologies",
        Some(token(&bob)),
        None,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn current_version_must_reference_a_version() {
    let (app, _) = test_app();
    let admin = register(&app, "alice@example.com", "Alice").await;

    let mut draft = postgres_draft();
    draft["currentVersion"] = json!("17");
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/technologies",
        Some(token(&admin)),
        Some(draft),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let tech = create_technology(&app, token(&admin), postgres_draft()).await;
    let id = tech["id"].as_str().unwrap();
    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/api/technologies/{id}"),
        Some(token(&admin)),
        Some(json!({ "currentVersion": "does-not-exist" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_cannot_move_a_record_between_tenants() {
    let (app, _) = test_app();
    let alice = register(&app, "alice@example.com", "Alice").await;

    let tech = create_technology(&app, token(&alice), postgres_draft()).await;
    let id = tech["id"].as_str().unwrap();

    let (status, updated) = request(
        &app,
        Method::PUT,
        &format!("/api/technologies/{id}"),
        Some(token(&alice)),
        Some(json!({ "tenantId": uuid::Uuid::new_v4(), "description": "patched" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tenantId"], tech["tenantId"]);
    assert_eq!(updated["description"], "patched");
}

#[tokio::test]
async fn public_listing_falls_back_to_the_whole_catalog() {
    let (app, _) = test_app();
    let alice = register(&app, "alice@example.com", "Alice").await;
    let bob = register_with(
        &app,
        json!({
            "email": "bob@example.com",
            "password": PASSWORD,
            "name": "Bob",
            "organizationName": "Bobs Org",
        }),
    )
    .await;
    create_technology(&app, token(&alice), postgres_draft()).await;
    create_technology(&app, token(&bob), postgres_draft()).await;

    // Anonymous callers see everything, read-only
    let (status, all) = request(&app, Method::GET, "/api/technologies/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    // Authenticated callers get their tenant's slice
    let (status, scoped) = request(
        &app,
        Method::GET,
        "/api/technologies/public",
        Some(token(&alice)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scoped.as_array().unwrap().len(), 1);
}
