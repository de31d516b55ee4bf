//! HTTP API tests against the router with an in-memory store.
//!
//! Requests go straight through the tower service, no socket involved.
//!
//! Run with: cargo test --test api_tests
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use todo_api::config::AppConfig;
use todo_api::routes::create_router;
use todo_api::state::AppState;
use todo_api::store::MemoryStore;

const PASSWORD: &str = "velvet-Quasar-harbor-91-Tundra!";
const OTHER_PASSWORD: &str = "Orbit-lantern-Mosaic-57-Fjord";

const TEST_CONFIG: &str = r#"
[database]
backend = "memory"

[auth]
secret_key = "integration-secret"
bcrypt_cost = 4
"#;

fn app_with_config(toml: &str) -> Router {
    let config = AppConfig::from_toml(toml).unwrap();
    let state = AppState::new(config, Arc::new(MemoryStore::new())).unwrap();
    create_router(state)
}

fn app() -> Router {
    app_with_config(TEST_CONFIG)
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    TestResponse {
        status,
        headers,
        body,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={}&password={}", username, password)))
        .unwrap()
}

async fn register(app: &Router, username: &str) -> String {
    let response = send(
        app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": username, "password1": PASSWORD, "password2": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["access_token"].as_str().unwrap().to_string()
}

async fn create_todo(app: &Router, token: &str, task: &str) -> Value {
    let response = send(
        app,
        request(Method::POST, "/todos", Some(token), Some(json!({ "task": task }))),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body
}

fn tasks(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|t| t["task"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Service routes
// =============================================================================

#[tokio::test]
async fn test_root_message() {
    let app = app();
    let response = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["message"].as_str().unwrap().contains("/auth/register"));
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();
    let health = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, Value::String("ok".to_string()));
    assert!(health.headers.get(header::CACHE_CONTROL).is_none());

    let ready = send(&app, request(Method::GET, "/ready", None, None)).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body, Value::String("ready".to_string()));
}

#[tokio::test]
async fn test_api_responses_are_not_cached_and_carry_request_id() {
    let app = app();
    let response = send(&app, request(Method::GET, "/", None, None)).await;
    assert_eq!(response.headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    let request_id = response.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn test_caller_request_id_is_echoed() {
    let app = app();
    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("x-request-id", "edge-42")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.headers.get("x-request-id").unwrap(), "edge-42");
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_register_returns_usable_token() {
    let app = app();
    let token = register(&app, "alice").await;

    let me = send(&app, request(Method::GET, "/auth/", Some(&token), None)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body, json!({ "username": "alice" }));
}

#[tokio::test]
async fn test_register_duplicate_user() {
    let app = app();
    register(&app, "alice").await;

    let response = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password1": PASSWORD, "password2": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "User already exists");
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let app = app();
    let response = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password1": PASSWORD, "password2": OTHER_PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "Passwords do not match");
}

#[tokio::test]
async fn test_register_weak_password() {
    let app = app();
    let response = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password1": "password", "password2": "password" })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Weak password:"));
}

#[tokio::test]
async fn test_register_rejects_long_username() {
    let app = app();
    let response = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "u".repeat(33), "password1": PASSWORD, "password2": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_padded_username() {
    let app = app();
    register(&app, "alice").await;

    for name in ["alice ", " alice"] {
        let response = send(
            &app,
            request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": name, "password1": PASSWORD, "password2": PASSWORD })),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body["detail"],
            "Username must not start or end with whitespace"
        );
    }

    // Login with the padded name does not reach alice's account
    let padded = send(&app, login_request("alice%20", PASSWORD)).await;
    assert_eq!(padded.status, StatusCode::BAD_REQUEST);
    assert_eq!(padded.body["detail"], "User does not exist");
}

#[tokio::test]
async fn test_register_missing_field_is_json_bad_request() {
    let app = app();
    let response = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password2": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .contains("password1"));
}

#[tokio::test]
async fn test_malformed_json_body_is_json_bad_request() {
    let app = app();
    let token = register(&app, "alice").await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/todos")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"task\": "))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"].is_string());

    let wrong_type = send(
        &app,
        request(
            Method::PATCH,
            "/todos/anything",
            Some(&token),
            Some(json!({ "completed": "yes" })),
        ),
    )
    .await;
    assert_eq!(wrong_type.status, StatusCode::BAD_REQUEST);
    assert!(wrong_type.body["detail"].is_string());
}

#[tokio::test]
async fn test_login_form_missing_password_is_json_bad_request() {
    let app = app();
    register(&app, "alice").await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=alice"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["detail"]
        .as_str()
        .unwrap()
        .contains("password"));
}

#[tokio::test]
async fn test_login_flow() {
    let app = app();
    register(&app, "alice").await;

    let response = send(&app, login_request("alice", PASSWORD)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "bearer");
    let token = response.body["access_token"].as_str().unwrap();

    let me = send(&app, request(Method::GET, "/auth/", Some(token), None)).await;
    assert_eq!(me.body["username"], "alice");
}

#[tokio::test]
async fn test_login_failures() {
    let app = app();
    register(&app, "alice").await;

    let wrong = send(&app, login_request("alice", OTHER_PASSWORD)).await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["detail"], "Incorrect password");

    let unknown = send(&app, login_request("nobody", PASSWORD)).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["detail"], "User does not exist");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = app();

    let missing = send(&app, request(Method::GET, "/todos/list", None, None)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["detail"], "Could not validate user.");
    assert_eq!(missing.headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let garbage = send(&app, request(Method::GET, "/auth/", Some("garbage"), None)).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_secret_is_rejected() {
    let app = app();
    let other = app_with_config(&TEST_CONFIG.replace("integration-secret", "other-secret"));
    let foreign_token = register(&other, "alice").await;

    let response = send(&app, request(Method::GET, "/auth/", Some(&foreign_token), None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_user_renames_and_changes_password() {
    let app = app();
    let token = register(&app, "alice").await;

    let response = send(
        &app,
        request(
            Method::PUT,
            "/auth/update",
            Some(&token),
            Some(json!({
                "username": "alicia",
                "password1": OTHER_PASSWORD,
                "password2": OTHER_PASSWORD,
            })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body, json!({ "username": "alicia" }));

    // Existing tokens follow the account, not the old name
    let me = send(&app, request(Method::GET, "/auth/", Some(&token), None)).await;
    assert_eq!(me.body["username"], "alicia");

    let old = send(&app, login_request("alicia", PASSWORD)).await;
    assert_eq!(old.status, StatusCode::BAD_REQUEST);
    let new = send(&app, login_request("alicia", OTHER_PASSWORD)).await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_user_to_taken_name() {
    let app = app();
    let token = register(&app, "alice").await;
    register(&app, "bob").await;

    let response = send(
        &app,
        request(
            Method::PUT,
            "/auth/update",
            Some(&token),
            Some(json!({ "username": "bob", "password1": PASSWORD, "password2": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "User already exists");
}

#[tokio::test]
async fn test_delete_user_revokes_token_and_removes_todos() {
    let app = app();
    let token = register(&app, "alice").await;
    create_todo(&app, &token, "soon gone").await;

    let response = send(&app, request(Method::DELETE, "/auth/delete", Some(&token), None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "username": "alice" }));

    let after = send(&app, request(Method::GET, "/todos/list", Some(&token), None)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);

    let token = register(&app, "alice").await;
    let list = send(&app, request(Method::GET, "/todos/list", Some(&token), None)).await;
    assert_eq!(list.body, json!([]));
}

// =============================================================================
// Todos
// =============================================================================

#[tokio::test]
async fn test_todo_lifecycle() {
    let app = app();
    let token = register(&app, "alice").await;

    let created = create_todo(&app, &token, "buy milk").await;
    assert_eq!(created["task"], "buy milk");
    assert_eq!(created["completed"], false);
    assert!(created.get("user_id").is_none());
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/todos/{}", id);

    let fetched = send(&app, request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created);

    let toggled = send(
        &app,
        request(
            Method::POST,
            &format!("/todos/toggle_complete/{}", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["completed"], true);

    let patched = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "task": "buy oat milk" })),
        ),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["task"], "buy oat milk");
    assert_eq!(patched.body["completed"], true);
    assert_eq!(patched.body["created_at"], created["created_at"]);

    let deleted = send(&app, request(Method::DELETE, &uri, Some(&token), None)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["id"], id.as_str());

    let gone = send(&app, request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["detail"], "Todo not found");
}

#[tokio::test]
async fn test_patch_can_mark_todo_pending_again() {
    let app = app();
    let token = register(&app, "alice").await;
    let created = create_todo(&app, &token, "laundry").await;
    let uri = format!("/todos/{}", created["id"].as_str().unwrap());

    let done = send(
        &app,
        request(Method::PATCH, &uri, Some(&token), Some(json!({ "completed": true }))),
    )
    .await;
    assert_eq!(done.body["completed"], true);

    let undone = send(
        &app,
        request(Method::PATCH, &uri, Some(&token), Some(json!({ "completed": false }))),
    )
    .await;
    assert_eq!(undone.status, StatusCode::OK);
    assert_eq!(undone.body["completed"], false);
}

#[tokio::test]
async fn test_filtered_lists() {
    let app = app();
    let token = register(&app, "alice").await;

    create_todo(&app, &token, "first").await;
    let second = create_todo(&app, &token, "second").await;
    create_todo(&app, &token, "third").await;
    send(
        &app,
        request(
            Method::POST,
            &format!("/todos/toggle_complete/{}", second["id"].as_str().unwrap()),
            Some(&token),
            None,
        ),
    )
    .await;

    let all = send(&app, request(Method::GET, "/todos/list", Some(&token), None)).await;
    assert_eq!(tasks(&all.body), ["first", "second", "third"]);

    let completed = send(&app, request(Method::GET, "/todos/completed", Some(&token), None)).await;
    assert_eq!(tasks(&completed.body), ["second"]);

    let pending = send(&app, request(Method::GET, "/todos/pending", Some(&token), None)).await;
    assert_eq!(tasks(&pending.body), ["first", "third"]);
}

#[tokio::test]
async fn test_todos_are_private_to_their_owner() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let todo = create_todo(&app, &alice, "alice only").await;
    let uri = format!("/todos/{}", todo["id"].as_str().unwrap());

    let list = send(&app, request(Method::GET, "/todos/list", Some(&bob), None)).await;
    assert_eq!(list.body, json!([]));

    for method in [Method::GET, Method::DELETE] {
        let response = send(&app, request(method, &uri, Some(&bob), None)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    let patch = send(
        &app,
        request(Method::PATCH, &uri, Some(&bob), Some(json!({ "task": "mine now" }))),
    )
    .await;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    let still_there = send(&app, request(Method::GET, &uri, Some(&alice), None)).await;
    assert_eq!(still_there.body["task"], "alice only");
}

#[tokio::test]
async fn test_unknown_todo_is_not_found() {
    let app = app();
    let token = register(&app, "alice").await;
    let response = send(
        &app,
        request(
            Method::POST,
            "/todos/toggle_complete/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_validation() {
    let app = app();
    let token = register(&app, "alice").await;

    let empty = send(
        &app,
        request(Method::POST, "/todos", Some(&token), Some(json!({ "task": "" }))),
    )
    .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let long = send(
        &app,
        request(
            Method::POST,
            "/todos",
            Some(&token),
            Some(json!({ "task": "x".repeat(257) })),
        ),
    )
    .await;
    assert_eq!(long.status, StatusCode::BAD_REQUEST);

    let created = create_todo(&app, &token, "valid").await;
    let blank_patch = send(
        &app,
        request(
            Method::PATCH,
            &format!("/todos/{}", created["id"].as_str().unwrap()),
            Some(&token),
            Some(json!({ "task": "   " })),
        ),
    )
    .await;
    assert_eq!(blank_patch.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let config = TEST_CONFIG.replace(
        "[database]",
        "[http]\ncors_origins = [\"http://localhost:3000\"]\n\n[database]",
    );
    let app = app_with_config(&config);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/todos/list")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;
    assert_eq!(
        response
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_no_cors_headers_by_default() {
    let app = app();
    let response = send(
        &app,
        Request::builder()
            .uri("/")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert!(response
        .headers
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
