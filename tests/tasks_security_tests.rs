// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Security tests for Cloud Task handlers.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use order_desk::config::ORDER_QUEUE_NAME;
use serde_json::json;
use tower::ServiceExt;

mod common;

fn submit_request(queue: Option<&str>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/submit-order")
        .header("content-type", "application/json");
    if let Some(queue) = queue {
        builder = builder.header("x-cloudtasks-queuename", queue);
    }
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(json!({"order_id": "ord_test"}).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_submit_order_no_header_forbidden() {
    let (app, _) = common::create_test_app().await;

    let response = app.oneshot(submit_request(None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_missing_auth_forbidden() {
    let (app, _) = common::create_test_app().await;

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_wrong_queue_name_forbidden() {
    let (app, state) = common::create_test_app().await;
    let token = common::create_test_tasks_oidc_jwt(&state.config);

    let response = app
        .oneshot(submit_request(Some("wrong-queue"), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_with_valid_token_allowed() {
    let (app, state) = common::create_test_app().await;
    let token = common::create_test_tasks_oidc_jwt(&state.config);

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), Some(&token)))
        .await
        .unwrap();

    // Passed the security check; the offline database then fails, which
    // must surface as a retryable 500.
    assert_ne!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_submit_order_wrong_service_account_forbidden() {
    let (app, state) = common::create_test_app().await;
    let mut claims = common::tasks_oidc_claims(&state.config);
    claims["email"] = json!("attacker@evil-project.iam.gserviceaccount.com");
    let token = common::sign_tasks_oidc_claims(&claims);

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_wrong_audience_forbidden() {
    let (app, state) = common::create_test_app().await;
    let mut claims = common::tasks_oidc_claims(&state.config);
    claims["aud"] = json!("https://some-other-service.run.app");
    let token = common::sign_tasks_oidc_claims(&claims);

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_unverified_email_forbidden() {
    let (app, state) = common::create_test_app().await;
    let mut claims = common::tasks_oidc_claims(&state.config);
    claims["email_verified"] = json!(false);
    let token = common::sign_tasks_oidc_claims(&claims);

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_order_session_jwt_forbidden() {
    let (app, _) = common::create_test_app().await;
    // A user session token is HS256 and must never pass task auth.
    let token = common::create_test_jwt("usr_admin", common::ADMIN_ROLE);

    let response = app
        .oneshot(submit_request(Some(ORDER_QUEUE_NAME), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
