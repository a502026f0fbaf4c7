//! Integration tests for `gantt_server`: the HTTP API end to end over a
//! temporary data file.

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use gantt_server::config::AuthConfig;
use gantt_server::gantt::JsonFileStore;
use gantt_server::server::{auth, router, AppState};
use gantt_server::VERSION;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

struct TestServer {
    _dir: TempDir,
    app: Router,
    data_path: PathBuf,
}

impl TestServer {
    fn new() -> Self {
        Self::with_auth(AuthConfig { cookie_secret: Some(SECRET.to_string()), ..AuthConfig::default() })
    }

    fn with_auth(auth: AuthConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data").join("tasks.json");
        let app = router(AppState::new(JsonFileStore::new(&data_path), auth));
        Self { _dir: dir, app, data_path }
    }

    fn seed(&self, value: &Value) {
        std::fs::create_dir_all(self.data_path.parent().unwrap()).unwrap();
        std::fs::write(&self.data_path, value.to_string()).unwrap();
    }

    fn on_disk(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(&self.data_path).unwrap()).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let cookie = format!(
            "gantt_auth={}",
            auth::issue_token(SECRET, chrono::Utc::now().timestamp_millis()).unwrap()
        );
        let request = Request::builder().method(method).uri(uri).header(COOKIE, cookie);
        let request = match body {
            Some(body) => request.header(CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };
        call(&self.app, request.unwrap()).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = call_raw(app, request).await;
    (status, body)
}

async fn call_raw(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie =
        response.headers().get(SET_COOKIE).map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, cookie, body)
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[tokio::test]
async fn test_api_requires_session() {
    let server = TestServer::new();
    let request = Request::builder().uri("/api/data").body(Body::empty()).unwrap();

    let (status, body) = call(&server.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!("Unauthorized"));
    assert!(!server.data_path.exists());
}

#[tokio::test]
async fn test_forged_session_rejected() {
    let server = TestServer::new();
    let token = auth::issue_token("some-other-secret", chrono::Utc::now().timestamp_millis()).unwrap();
    let request = Request::builder()
        .uri("/api/tasks")
        .header(COOKIE, format!("gantt_auth={token}"))
        .body(Body::empty())
        .unwrap();

    let (status, _) = call(&server.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_read_creates_empty_document() {
    let server = TestServer::new();

    let (status, body) = server.get("/api/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tasks": [], "links": [], "scales": []}));
    assert_eq!(server.on_disk(), body);
}

#[tokio::test]
async fn test_create_and_list_tasks() {
    let server = TestServer::new();

    let (status, created) = server
        .send(
            Method::POST,
            "/api/tasks",
            Some(json!({"text": "Kickoff", "start": "2024-01-10", "duration": 2, "parent": 0})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["start"], "2024-01-10T00:00:00Z");
    assert_eq!(created["end"], "2024-01-12T00:00:00Z");

    let (status, tasks) = server.get("/api/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks, json!([created]));
}

#[tokio::test]
async fn test_put_with_temp_id_creates_task() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 5, "text": "Existing"}], "links": []}));

    let (status, created) = server
        .send(Method::PUT, "/api/tasks/temp%3A%2F%2F42", Some(json!({"id": "temp://42", "text": "Fresh"})))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 6);
    assert_eq!(created["text"], "Fresh");
}

#[tokio::test]
async fn test_put_merges_existing_task() {
    let server = TestServer::new();
    server.seed(&json!({
        "tasks": [{"id": 1, "text": "Old", "start": "2024-01-01T00:00:00Z", "progress": 10, "open": true}],
        "links": []
    }));

    let (status, task) = server
        .send(Method::PUT, "/api/tasks/1", Some(json!({"task": {"text": "New", "end": "2024-01-05 12:00"}})))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        task,
        json!({
            "id": 1,
            "text": "New",
            "start": "2024-01-01T00:00:00Z",
            "end": "2024-01-05T12:00:00Z",
            "progress": 10,
            "open": true
        })
    );
    assert_eq!(server.on_disk()["tasks"][0], task);
}

#[tokio::test]
async fn test_put_null_start_rederives_from_end() {
    let server = TestServer::new();
    server.seed(&json!({
        "tasks": [{"id": 1, "start": "2024-01-01T00:00:00Z", "end": "2024-01-05T00:00:00Z", "duration": 2}],
        "links": []
    }));

    let (status, task) = server.send(Method::PUT, "/api/tasks/1", Some(json!({"start": null}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["start"], "2024-01-03T00:00:00Z");
    assert_eq!(server.on_disk()["tasks"][0], task);
}

#[tokio::test]
async fn test_loose_task_fields_are_served_unchanged() {
    let server = TestServer::new();
    let tasks = json!([
        {"id": 1, "text": "A", "assigned": 3, "progress": "50"},
        {"id": 2, "assigned": [1, 2], "duration": "4"}
    ]);
    server.seed(&json!({"tasks": tasks, "links": []}));

    let (status, body) = server.get("/api/tasks").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, tasks);
    assert_eq!(server.on_disk()["tasks"], tasks);
}

#[tokio::test]
async fn test_null_collections_are_healed() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": null, "links": null}));

    let (status, body) = server.get("/api/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tasks": [], "links": []}));
    assert_eq!(server.on_disk(), body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_concurrent_creates_on_one_worker() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [], "links": []}));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let app = server.app.clone();
            let cookie = format!(
                "gantt_auth={}",
                auth::issue_token(SECRET, chrono::Utc::now().timestamp_millis()).unwrap()
            );
            let request = Request::builder()
                .method(Method::POST)
                .uri("/api/tasks")
                .header(COOKIE, cookie)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"text": format!("T{i}")}).to_string()))
                .unwrap();
            tokio::spawn(async move { call(&app, request).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let (status, task) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        ids.push(task["id"].as_i64().unwrap());
    }
    ids.sort_unstable();

    assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    assert_eq!(server.on_disk()["tasks"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_put_and_delete_unknown_task_is_404() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [], "links": []}));

    let (status, body) = server.send(Method::PUT, "/api/tasks/9", Some(json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Task not found"}));

    let (status, _) = server.send(Method::DELETE, "/api/tasks/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutations_before_data_file_exists_are_404() {
    let server = TestServer::new();

    let (status, body) = server.send(Method::PUT, "/api/tasks/1", Some(json!({"text": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Data file not found"}));

    let (status, _) = server.send(Method::DELETE, "/api/links/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!server.data_path.exists());
}

#[tokio::test]
async fn test_delete_task() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 1}, {"id": 2}], "links": []}));

    let (status, body) = server.send(Method::DELETE, "/api/tasks/2", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
    assert_eq!(server.on_disk()["tasks"], json!([{"id": 1}]));
}

#[tokio::test]
async fn test_replace_with_temp_ids_migrates_on_next_read() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 4}], "links": []}));

    let (status, body) = server
        .send(
            Method::POST,
            "/api/tasks",
            Some(json!([
                {"id": 4, "text": "Keep"},
                {"task": {"text": "New", "parent": 4}, "id": "temp://1"}
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["tasks"][1]["id"], "temp://1");

    let (_, doc) = server.get("/api/data").await;
    assert_eq!(doc["tasks"][1]["id"], 5);
    assert_eq!(doc["tasks"][1]["parent"], 4);
    assert_eq!(server.on_disk(), doc);
}

#[tokio::test]
async fn test_temp_link_endpoints_follow_their_task() {
    let server = TestServer::new();

    server
        .send(
            Method::POST,
            "/api/data",
            Some(json!({
                "tasks": [{"id": 2}, {"id": "temp://1", "parent": "temp://1"}],
                "links": [{"id": 1, "source": "temp://1", "target": "temp://1"}]
            })),
        )
        .await;
    let (_, doc) = server.get("/api/data").await;

    assert_eq!(doc["tasks"][1]["id"], 3);
    assert_eq!(doc["tasks"][1]["parent"], 3);
    assert_eq!(doc["links"][0]["source"], 3);
    assert_eq!(doc["links"][0]["target"], 3);
}

#[tokio::test]
async fn test_read_prunes_dangling_references() {
    let server = TestServer::new();
    server.seed(&json!({
        "tasks": [{"id": 1}, {"id": 2, "parent": 99}],
        "links": [{"id": 1, "source": 1, "target": 50}]
    }));

    let (_, doc) = server.get("/api/data").await;

    assert_eq!(doc["tasks"][1]["parent"], 0);
    assert_eq!(doc["links"], json!([]));
}

#[tokio::test]
async fn test_link_lifecycle() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 1}, {"id": 2}], "links": []}));

    let (status, created) = server
        .send(Method::POST, "/api/links", Some(json!({"link": {"source": 1, "target": 2, "type": "e2s"}})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["ok"], true);
    assert_eq!(created["link"]["id"], 1);

    let (status, updated) =
        server.send(Method::PUT, "/api/links/1", Some(json!({"type": "s2s"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["link"], json!({"id": 1, "source": 1, "target": 2, "type": "s2s"}));

    let (status, _) = server.send(Method::PUT, "/api/links/7", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.send(Method::DELETE, "/api/links/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, links) = server.get("/api/links").await;
    assert_eq!(links, json!([]));
}

#[tokio::test]
async fn test_users_replace_and_list() {
    let server = TestServer::new();

    let (_, users) = server.get("/api/users").await;
    assert_eq!(users, json!([]));

    let catalogue = json!([{"id": 1, "name": "Ana", "color": "#f00"}, {"id": 2, "name": "Rui"}]);
    let (status, body) =
        server.send(Method::POST, "/api/users", Some(json!({"users": catalogue}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "users": catalogue}));

    let (_, users) = server.get("/api/users").await;
    assert_eq!(users, catalogue);
}

#[tokio::test]
async fn test_query_by_parent() {
    let server = TestServer::new();
    server.seed(&json!({
        "tasks": [{"id": 1, "parent": 0}, {"id": 2, "parent": 1}, {"id": 3, "parent": 1}, {"id": 4, "parent": 0}],
        "links": [{"id": 1, "source": 2, "target": 3}, {"id": 2, "source": 1, "target": 4}]
    }));

    let (status, subtree) = server.get("/api?parent=1").await;
    let (_, by_parent_id) = server.get("/api?parentId=1").await;
    let (_, whole) = server.get("/api").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        subtree,
        json!({
            "tasks": [{"id": 2, "parent": 1}, {"id": 3, "parent": 1}],
            "links": [{"id": 1, "source": 2, "target": 3}]
        })
    );
    assert_eq!(by_parent_id, subtree);
    assert_eq!(whole["tasks"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_replace_document() {
    let server = TestServer::new();
    let doc = json!({
        "tasks": [{"id": 1, "text": "A", "start": "2024-01-01"}],
        "links": [],
        "scales": [{"unit": "week", "step": 1}]
    });

    let (status, body) = server.send(Method::POST, "/api/data", Some(doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, stored) = server.get("/api/data").await;
    assert_eq!(stored["tasks"][0]["start"], "2024-01-01T00:00:00Z");
    assert_eq!(stored["scales"], json!([{"unit": "week", "step": 1}]));
}

#[tokio::test]
async fn test_invalid_payloads_are_400() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 1}], "links": []}));

    for (method, uri, body) in [
        (Method::POST, "/api/tasks", json!(7)),
        (Method::POST, "/api/tasks", json!({"id": ["not", "an", "id"]})),
        (Method::POST, "/api/users", json!([{"name": "no id"}])),
        (Method::POST, "/api/data", json!({"tasks": "nope"})),
        (Method::PUT, "/api/tasks/1", json!("text")),
    ] {
        let (status, response) = server.send(method, uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response["error"], "invalid_payload");
        assert!(response["details"].is_string());
    }
    assert_eq!(server.on_disk(), json!({"tasks": [{"id": 1}], "links": []}));
}

#[tokio::test]
async fn test_malformed_data_file_is_500() {
    let server = TestServer::new();
    std::fs::create_dir_all(server.data_path.parent().unwrap()).unwrap();
    std::fs::write(&server.data_path, "{ broken").unwrap();

    let (status, body) = server.get("/api/tasks").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("Invalid data file"));
}

#[tokio::test]
async fn test_legacy_numeric_routes() {
    let server = TestServer::new();
    server.seed(&json!({"tasks": [{"id": 1, "text": "A"}, {"id": "2", "text": "B"}], "links": []}));

    let (status, body) = server.send(Method::PUT, "/api/1", Some(json!({"progress": 80}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
    assert_eq!(server.on_disk()["tasks"][0]["progress"], 80);

    let (status, _) = server.send(Method::DELETE, "/api/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.send(Method::DELETE, "/api/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.send(Method::DELETE, "/api/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.on_disk()["tasks"], json!([{"id": "2", "text": "B"}]));
}

#[tokio::test]
async fn test_legacy_put_normalizes_and_creates_missing_file() {
    let server = TestServer::new();

    let (status, body) = server.send(Method::PUT, "/api/1", Some(json!({"progress": 5}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Task not found"}));
    assert_eq!(server.on_disk(), json!({"tasks": [], "links": [], "scales": []}));

    server.seed(&json!({"tasks": [{"id": 1, "start": "2024-01-01"}], "links": []}));
    let (status, _) = server.send(Method::PUT, "/api/1", Some(json!({"end": "2024-01-02 06:00"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        server.on_disk()["tasks"][0],
        json!({"id": 1, "start": "2024-01-01T00:00:00Z", "end": "2024-01-02T06:00:00Z"})
    );
}

#[tokio::test]
async fn test_login_without_configuration_is_500() {
    let server = TestServer::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"password": "pw"}).to_string()))
        .unwrap();

    let (status, body) = call(&server.app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Auth not configured"}));
}

#[tokio::test]
async fn test_login_session_flow() {
    let server = TestServer::with_auth(AuthConfig {
        cookie_secret: Some(SECRET.to_string()),
        password_hash: Some(auth::hash_password("open sesame").unwrap()),
        ..AuthConfig::default()
    });
    let login = |password: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"password": password}).to_string()))
            .unwrap()
    };

    let (status, cookie, body) = call_raw(&server.app, login("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let (status, cookie, body) = call_raw(&server.app, login("open sesame")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
    let cookie = cookie.unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let session = cookie.split(';').next().unwrap().to_string();

    let me = Request::builder().uri("/auth/me").header(COOKIE, &session).body(Body::empty()).unwrap();
    let (status, body) = call(&server.app, me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let data = Request::builder().uri("/api/data").header(COOKIE, &session).body(Body::empty()).unwrap();
    let (status, _) = call(&server.app, data).await;
    assert_eq!(status, StatusCode::OK);

    let logout = Request::builder().method(Method::POST).uri("/auth/logout").body(Body::empty()).unwrap();
    let (status, cookie, _) = call_raw(&server.app, logout).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_me_without_cookie_is_401() {
    let server = TestServer::new();
    let request = Request::builder().uri("/auth/me").body(Body::empty()).unwrap();

    let (status, body) = call(&server.app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"ok": false}));
}
