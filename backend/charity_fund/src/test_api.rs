use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::allocation::AllocationPolicy;
use crate::api::{router, ApiState};
use crate::auth::USER_ID_HEADER;
use crate::config::Config;
use crate::db;

const ADMIN: &str = "1";
const USER: &str = "2";

async fn app() -> Router {
    let pool = db::init_memory_pool().await.unwrap();
    let config = Config {
        app_title: "Test Fund".to_string(),
        database_url: "sqlite::memory:".to_string(),
        api_port: 0,
        superuser_ids: HashSet::from([1]),
        allocation_policy: AllocationPolicy::Drain,
    };
    router(Arc::new(ApiState::new(pool, config)))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header(USER_ID_HEADER, user);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!("{uri} answered a non-JSON body ({e}): {}", String::from_utf8_lossy(&bytes))
        })
    };
    (status, value)
}

async fn create_project(app: &Router, name: &str, amount: i64) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/charity_project",
        Some(ADMIN),
        Some(json!({ "name": name, "description": "Food and shelter", "full_amount": amount })),
    )
    .await
}

#[tokio::test]
async fn health_reports_title() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["title"], "Test Fund");
    assert_eq!(body["allocation_policy"], "drain");
}

#[tokio::test]
async fn project_lifecycle_over_http() {
    let app = app().await;

    let (status, _) = call(&app, Method::GET, "/charity_project", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, project) = create_project(&app, "Cats", 1000).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["invested_amount"], 0);
    assert_eq!(project["fully_invested"], false);
    assert!(project.get("close_date").is_none());
    let id = project["id"].as_i64().unwrap();

    let (status, body) = create_project(&app, "Cats", 10).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/charity_project/{id}"),
        Some(ADMIN),
        Some(json!({ "description": "Only food" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Only food");
    assert_eq!(updated["name"], "Cats");

    let (status, list) = call(&app, Method::GET, "/charity_project", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, deleted) = call(
        &app,
        Method::DELETE,
        &format!("/charity_project/{id}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/charity_project/{id}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn project_management_requires_superuser() {
    let app = app().await;
    let payload = json!({ "name": "Cats", "description": "Food", "full_amount": 10 });

    let (status, _) = call(&app, Method::POST, "/charity_project", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::POST, "/charity_project", Some(USER), Some(payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/donation", Some(USER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_payloads_are_unprocessable() {
    let app = app().await;

    let (status, body) = create_project(&app, "", 10).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, body) = create_project(&app, "Cats", 0).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, body) = call(
        &app,
        Method::POST,
        "/donation",
        Some(USER),
        Some(json!({ "full_amount": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    // Missing field and wrong type fail in the JSON extractor.
    let (status, body) = call(
        &app,
        Method::POST,
        "/donation",
        Some(USER),
        Some(json!({ "comment": "no amount" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("full_amount"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/charity_project",
        Some(ADMIN),
        Some(json!({ "name": "Cats", "description": "Food", "full_amount": "ten" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (_, project) = create_project(&app, "Cats", 10).await;
    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/charity_project/{}", project["id"]),
        Some(ADMIN),
        Some(json!({ "invested_amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("invested_amount"));
}

#[tokio::test]
async fn caller_is_checked_before_the_body() {
    let app = app().await;
    let garbage = json!({ "unexpected": true });

    let (status, body) = call(&app, Method::POST, "/charity_project", None, Some(garbage.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body) = call(&app, Method::POST, "/charity_project", Some(USER), Some(garbage.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, body) = call(&app, Method::PATCH, "/charity_project/1", None, Some(garbage.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body) = call(&app, Method::POST, "/donation", None, Some(garbage)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn donations_flow_into_projects() {
    let app = app().await;
    create_project(&app, "Cats", 1000).await;

    let (status, donation) = call(
        &app,
        Method::POST,
        "/donation",
        Some(USER),
        Some(json!({ "full_amount": 400, "comment": "for the cats" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(donation["full_amount"], 400);
    assert_eq!(donation["comment"], "for the cats");
    // Donors do not see allocation details.
    assert!(donation.get("invested_amount").is_none());
    assert!(donation.get("user_id").is_none());

    call(
        &app,
        Method::POST,
        "/donation",
        Some(USER),
        Some(json!({ "full_amount": 700 })),
    )
    .await;

    let (_, projects) = call(&app, Method::GET, "/charity_project", None, None).await;
    assert_eq!(projects[0]["invested_amount"], 1000);
    assert_eq!(projects[0]["fully_invested"], true);
    assert!(projects[0]["close_date"].is_string());

    let (status, all) = call(&app, Method::GET, "/donation", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["invested_amount"], 400);
    assert_eq!(all[1]["invested_amount"], 600);
    assert_eq!(all[1]["fully_invested"], false);
    assert_eq!(all[1]["user_id"], 2);

    let (status, mine) = call(&app, Method::GET, "/donation/my", Some(USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let (_, others) = call(&app, Method::GET, "/donation/my", Some("3"), None).await;
    assert!(others.as_array().unwrap().is_empty());

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/charity_project/{}", projects[0]["id"]),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn closed_projects_report() {
    let app = app().await;
    create_project(&app, "Cats", 100).await;

    let (status, body) = call(&app, Method::GET, "/reports/closed_projects", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    create_project(&app, "Dogs", 5000).await;
    call(
        &app,
        Method::POST,
        "/donation",
        Some(USER),
        Some(json!({ "full_amount": 150 })),
    )
    .await;

    let (status, report) = call(&app, Method::GET, "/reports/closed_projects", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = report.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Cats");
    assert!(rows[0]["duration_seconds"].as_i64().unwrap() >= 0);

    let (status, _) = call(&app, Method::GET, "/reports/closed_projects", Some(USER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
