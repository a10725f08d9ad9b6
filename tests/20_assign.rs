mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{authority_names, TestApp};

async fn create_role(app: &TestApp, token: &str, name: &str, code: &str) -> Result<Value> {
    let (status, body) = app
        .post("/api/roles", token, json!({ "name": name, "code": code }))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    Ok(body["data"].clone())
}

async fn role_details(app: &TestApp, token: &str, uuid: &str) -> Result<Value> {
    let (status, body) = app.get(&format!("/api/roles/{}", uuid), token).await?;
    assert_eq!(status, StatusCode::OK, "lookup failed: {}", body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn assignment_replaces_the_whole_set() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let role = create_role(&app, &token, "Clerk", "CLERK").await?;
    let uuid = role["uuid"].as_str().unwrap().to_string();

    let a = app.authority_uuid("ROLE_CREATE").await?;
    let b = app.authority_uuid("ROLE_GET").await?;
    let c = app.authority_uuid("USER_GET").await?;

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [a, b] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "assign failed: {}", body);
    assert_eq!(authority_names(&body["data"]), vec!["ROLE_CREATE", "ROLE_GET"]);

    let (status, _) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [c] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let details = role_details(&app, &token, &uuid).await?;
    assert_eq!(authority_names(&details), vec!["USER_GET"]);
    Ok(())
}

#[tokio::test]
async fn empty_assignment_clears_and_duplicates_collapse() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let role = create_role(&app, &token, "Auditor", "AUDITOR").await?;
    let uuid = role["uuid"].as_str().unwrap().to_string();
    let a = app.authority_uuid("ROLE_GET").await?;

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [a, a, a] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(authority_names(&body["data"]), vec!["ROLE_GET"]);

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [] }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(authority_names(&body["data"]).is_empty());
    Ok(())
}

#[tokio::test]
async fn stale_version_is_rejected_without_writing() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let role = create_role(&app, &token, "Cashier", "CASHIER").await?;
    let uuid = role["uuid"].as_str().unwrap().to_string();
    assert_eq!(role["version"], 0);

    let a = app.authority_uuid("ROLE_GET").await?;
    let b = app.authority_uuid("ROLE_DELETE").await?;

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [a], "version": 0 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 1);

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [b], "version": 0 }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "unexpected body: {}", body);
    assert_eq!(body["code"], "CONFLICT");

    let details = role_details(&app, &token, &uuid).await?;
    assert_eq!(authority_names(&details), vec!["ROLE_GET"]);
    assert_eq!(details["version"], 1);
    Ok(())
}

#[tokio::test]
async fn unknown_authority_fails_without_writing() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let role = create_role(&app, &token, "Teller", "TELLER").await?;
    let uuid = role["uuid"].as_str().unwrap().to_string();
    let a = app.authority_uuid("ROLE_GET").await?;
    let b = app.authority_uuid("ROLE_CREATE").await?;
    let missing = uuid::Uuid::new_v4().to_string();

    app.post(
        "/api/roles/assign-authorities",
        &token,
        json!({ "uuid": uuid, "authorityIds": [a] }),
    )
    .await?;

    let (status, body) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [b, missing] }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        body["message"].as_str().unwrap_or_default().contains(&missing),
        "unresolved id not listed: {}",
        body
    );

    let details = role_details(&app, &token, &uuid).await?;
    assert_eq!(authority_names(&details), vec!["ROLE_GET"]);
    Ok(())
}

#[tokio::test]
async fn unknown_role_is_not_found() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;

    let (status, _) = app
        .post(
            "/api/roles/assign-authorities",
            &token,
            json!({ "uuid": uuid::Uuid::new_v4(), "authorityIds": [] }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn menu_item_assignment_follows_the_same_contract() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;

    let (status, body) = app
        .post(
            "/api/menu-items",
            &token,
            json!({ "name": "Reports", "route": "/main/reports", "sortOrder": 9 }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();
    let a = app.authority_uuid("USER_GET").await?;

    let (status, body) = app
        .post(
            "/api/menu-items/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [a], "version": 0 }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "assign failed: {}", body);
    assert_eq!(authority_names(&body["data"]), vec!["USER_GET"]);

    let (status, _) = app
        .post(
            "/api/menu-items/assign-authorities",
            &token,
            json!({ "uuid": uuid, "authorityIds": [], "version": 0 }),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn user_roles_are_replaced_on_update() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let clerk = create_role(&app, &token, "Clerk", "CLERK").await?;
    let auditor = create_role(&app, &token, "Auditor", "AUDITOR").await?;

    let (status, body) = app
        .post(
            "/api/users",
            &token,
            json!({
                "email": "jo@example.com",
                "firstName": "Jo",
                "lastName": "Doe",
                "roles": [clerk["uuid"], auditor["uuid"]]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    assert_eq!(body["data"]["roles"].as_array().map(Vec::len), Some(2));
    assert!(body["data"].get("credentialHash").is_none());
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    let (status, body) = app
        .put(
            &format!("/api/users/{}", uuid),
            &token,
            json!({
                "uuid": uuid,
                "email": "jo@example.com",
                "firstName": "Jo",
                "lastName": "Doe",
                "roles": [auditor["uuid"]]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "update failed: {}", body);
    let roles = body["data"]["roles"].as_array().cloned().unwrap_or_default();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["code"], "AUDITOR");
    Ok(())
}

#[tokio::test]
async fn user_write_with_unknown_role_changes_nothing() -> Result<()> {
    let app = common::spawn_app().await?;
    let token = app.admin_token().await?;
    let clerk = create_role(&app, &token, "Clerk", "CLERK").await?;
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, body) = app
        .post(
            "/api/users",
            &token,
            json!({ "email": "jo@example.com", "firstName": "Jo", "lastName": "Doe", "roles": [clerk["uuid"], missing] }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap_or_default().contains(&missing));

    let (_, body) = app.get("/api/users?email=jo@example.com", &token).await?;
    assert_eq!(body["data"]["totalElements"], 0);

    let (status, body) = app
        .post(
            "/api/users",
            &token,
            json!({ "email": "jo@example.com", "firstName": "Jo", "lastName": "Doe", "roles": [clerk["uuid"]] }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(
            &format!("/api/users/{}", uuid),
            &token,
            json!({ "uuid": uuid, "email": "joanne@example.com", "firstName": "Jo", "lastName": "Doe", "roles": [missing] }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/api/users/{}", uuid), &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "jo@example.com");
    assert_eq!(body["data"]["roles"][0]["code"], "CLERK");
    Ok(())
}
