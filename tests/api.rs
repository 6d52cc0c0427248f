//! End-to-end tests for the user API over real HTTP.

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use user_api::domain::User;
use user_api::http::dto::{ErrorResponse, HealthResponse, ListUsersResponse, MessageResponse};

mod common;
use common::TestServer;

async fn create(server: &TestServer, name: &str) -> User {
    let response = server
        .client
        .post(server.url("/api/v1/users"))
        .json(&json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn error_of(response: reqwest::Response) -> String {
    response.json::<ErrorResponse>().await.unwrap().error
}

#[tokio::test]
async fn test_create_user() {
    let server = TestServer::start().await;

    let user = create(&server, "Ada").await;
    assert!(user.id > 0);
    assert_eq!(user.name, "Ada");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.created_at, user.updated_at);
}

#[tokio::test]
async fn test_invalid_body_is_rejected_without_storing() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/v1/users"))
        .json(&json!({ "name": "", "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = error_of(response).await;
    assert!(message.contains("name"), "{message}");
    assert!(message.contains("email"), "{message}");

    let page: ListUsersResponse = server
        .client
        .get(server.url("/api/v1/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(page.users.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/v1/users"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_user() {
    let server = TestServer::start().await;
    let created = create(&server, "Grace").await;

    let response = server
        .client
        .get(server.url(&format!("/api/v1/users/{}", created.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<User>().await.unwrap(), created);

    let response = server
        .client
        .get(server.url("/api/v1/users/4242"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(response).await, "User not found");

    let response = server
        .client
        .get(server.url("/api/v1/users/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Invalid user ID");
}

#[tokio::test]
async fn test_list_paging_and_defaults() {
    let server = TestServer::start().await;
    for name in ["A", "B", "C", "D", "E"] {
        create(&server, name).await;
    }

    let page: ListUsersResponse = server
        .client
        .get(server.url("/api/v1/users?limit=2&offset=0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.users.len(), 2);
    assert_eq!((page.limit, page.offset), (2, 0));
    assert_eq!(page.users[0].name, "A");

    let page: ListUsersResponse = server
        .client
        .get(server.url("/api/v1/users?limit=-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.limit, 20);
    assert_eq!(page.offset, 0);
    assert_eq!(page.users.len(), 5);

    let page: ListUsersResponse = server
        .client
        .get(server.url("/api/v1/users?limit=10&offset=3"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<_> = page.users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["D", "E"]);
}

#[tokio::test]
async fn test_update_user() {
    let server = TestServer::start().await;
    let created = create(&server, "Ada").await;

    let response = server
        .client
        .put(server.url(&format!("/api/v1/users/{}", created.id)))
        .json(&json!({ "name": "Ada Lovelace", "email": "ada@lovelace.org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: User = response.json().await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Ada Lovelace");
    assert_eq!(updated.created_at, created.created_at);

    let response = server
        .client
        .put(server.url("/api/v1/users/999"))
        .json(&json!({ "name": "Nobody", "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_then_get_is_404() {
    let server = TestServer::start().await;
    let created = create(&server, "Ada").await;
    let url = server.url(&format!("/api/v1/users/{}", created.id));

    let response = server.client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = response.json().await.unwrap();
    assert_eq!(body.message, "User deleted successfully");

    let response = server.client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.json::<HealthResponse>().await.unwrap(),
        HealthResponse {
            status: "healthy".into(),
            service: env!("CARGO_PKG_NAME").into(),
        }
    );
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/api/v2/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.json::<Value>().await.unwrap()["error"].is_string());

    let response = server
        .client
        .patch(server.url("/api/v1/users/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET, PUT, DELETE");
}

#[tokio::test]
async fn test_request_id_is_assigned_and_propagated() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());

    let response = server
        .client
        .get(server.url("/health"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn test_graceful_stop_when_idle() {
    let server = TestServer::start().await;
    create(&server, "Ada").await;

    let (drained, exit) = server.stop(Duration::from_secs(2)).await;
    assert!(drained.is_ok());
    assert!(exit.is_ok());
}
