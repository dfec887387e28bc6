//! HttpBackend against an in-process fake collections API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use schemasync_client::{ClientConfig, HttpBackend};
use schemasync_core::{
    Backend, BackendError, Collection, Field, FieldKind, MigrationOperation,
};

const TOKEN: &str = "admin-token";

#[derive(Default)]
struct FakeState {
    collections: Vec<Value>,
    requests: Vec<String>,
    throttle: usize,
}

type Shared = Arc<Mutex<FakeState>>;

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"code": status.as_u16(), "message": message, "data": {}})),
    )
        .into_response()
}

fn guard(state: &Shared, headers: &HeaderMap, request: String) -> Option<Response> {
    let mut state = state.lock();
    state.requests.push(request);

    if state.throttle > 0 {
        state.throttle -= 1;
        return Some(error(StatusCode::TOO_MANY_REQUESTS, "Too many requests."));
    }

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TOKEN);
    if !authorized {
        return Some(error(StatusCode::UNAUTHORIZED, "The request requires admin authorization token to be set."));
    }
    None
}

async fn auth(Json(body): Json<Value>) -> Response {
    if body["identity"] == "admin@example.com" && body["password"] == "secret" {
        Json(json!({"token": TOKEN, "admin": {"id": "a1"}})).into_response()
    } else {
        error(StatusCode::BAD_REQUEST, "Failed to authenticate.")
    }
}

async fn list(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = query.get("perPage").and_then(|p| p.parse().ok()).unwrap_or(30);

    if let Some(denied) = guard(&state, &headers, format!("GET page={} perPage={}", page, per_page)) {
        return denied;
    }

    let state = state.lock();
    let total = state.collections.len();
    let items: Vec<Value> = state
        .collections
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect();

    Json(json!({
        "page": page,
        "perPage": per_page,
        "totalItems": total,
        "totalPages": total.div_ceil(per_page),
        "items": items,
    }))
    .into_response()
}

async fn create(State(state): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if let Some(denied) = guard(&state, &headers, "POST".to_string()) {
        return denied;
    }

    let mut state = state.lock();
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if state.collections.iter().any(|c| c["name"] == name.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": 400,
                "message": "Failed to create collection.",
                "data": {"name": {"code": "validation_collection_name_exists", "message": "Collection name must be unique."}}
            })),
        )
            .into_response();
    }

    body["id"] = json!(format!("pbc_{}", name));
    state.collections.push(body.clone());
    Json(body).into_response()
}

fn position(state: &FakeState, key: &str) -> Option<usize> {
    state
        .collections
        .iter()
        .position(|c| c["id"] == key || c["name"] == key)
}

async fn view(State(state): State<Shared>, headers: HeaderMap, Path(key): Path<String>) -> Response {
    if let Some(denied) = guard(&state, &headers, format!("GET {}", key)) {
        return denied;
    }

    let state = state.lock();
    match position(&state, &key) {
        Some(index) => Json(state.collections[index].clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

async fn update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = guard(&state, &headers, format!("PATCH {}", key)) {
        return denied;
    }

    let mut state = state.lock();
    match position(&state, &key) {
        Some(index) => {
            state.collections[index] = body.clone();
            Json(body).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

async fn remove(State(state): State<Shared>, headers: HeaderMap, Path(key): Path<String>) -> Response {
    if let Some(denied) = guard(&state, &headers, format!("DELETE {}", key)) {
        return denied;
    }

    let mut state = state.lock();
    match position(&state, &key) {
        Some(index) => {
            state.collections.remove(index);
            StatusCode::NO_CONTENT.into_response()
        }
        None => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

async fn spawn_server(collections: Vec<Value>) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(FakeState {
        collections,
        ..FakeState::default()
    }));

    let app = Router::new()
        .route("/api/admins/auth-with-password", post(auth))
        .route("/api/collections", get(list).post(create))
        .route(
            "/api/collections/:key",
            get(view).patch(update).delete(remove),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn posts() -> Value {
    json!({
        "id": "pbc_posts",
        "name": "posts",
        "type": "base",
        "schema": [
            {"id": "f_title", "name": "title", "type": "text", "required": true, "options": {"max": 200}}
        ],
        "indexes": [],
        "listRule": "",
        "viewRule": null
    })
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url).with_credentials("admin@example.com", "secret")
}

#[tokio::test]
async fn test_fetch_schema_paginates() {
    let collections = vec![
        posts(),
        json!({"id": "pbc_tags", "name": "tags", "type": "base", "schema": []}),
        json!({"id": "pbc_users", "name": "users", "type": "auth", "schema": []}),
    ];
    let (url, state) = spawn_server(collections).await;

    let backend = HttpBackend::connect(config(&url).with_page_size(2)).await.unwrap();
    let schema = backend.fetch_current_schema().await.unwrap();

    let names: Vec<_> = schema.collections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["posts", "tags", "users"]);
    assert_eq!(
        schema.get("posts").unwrap().field("title").unwrap().id.as_deref(),
        Some("f_title")
    );
    assert_eq!(
        state.lock().requests,
        vec!["GET page=1 perPage=2", "GET page=2 perPage=2"]
    );
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let (url, _) = spawn_server(Vec::new()).await;
    let backend =
        HttpBackend::new(ClientConfig::new(&url).with_credentials("admin@example.com", "wrong"))
            .unwrap();

    match backend.authenticate().await {
        Err(BackendError::Unauthorized(message)) => {
            assert_eq!(message, "Failed to authenticate.")
        }
        other => panic!("Expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (url, _) = spawn_server(vec![posts()]).await;
    let backend = HttpBackend::new(ClientConfig::new(&url)).unwrap();

    let err = backend.fetch_current_schema().await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized(_)));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_throttling_maps_to_rate_limited() {
    let (url, state) = spawn_server(vec![posts()]).await;
    state.lock().throttle = 1;
    let backend = HttpBackend::new(ClientConfig::new(&url).with_token(TOKEN)).unwrap();

    let err = backend.fetch_current_schema().await.unwrap_err();
    assert!(err.is_rate_limited());

    // the throttle only covered one request
    assert_eq!(backend.fetch_current_schema().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_field_is_read_modify_write() {
    let (url, state) = spawn_server(vec![posts()]).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let op = MigrationOperation::add_field("posts", &Field::new("body", FieldKind::text()));
    backend.apply_operation(&op).await.unwrap();

    let state = state.lock();
    assert_eq!(state.requests, vec!["GET posts", "PATCH pbc_posts"]);

    let stored = &state.collections[0];
    assert_eq!(stored["schema"][0]["id"], "f_title");
    assert_eq!(stored["schema"][1]["name"], "body");
    assert_eq!(stored["listRule"], "");
}

#[tokio::test]
async fn test_update_keeps_settings_outside_the_model() {
    let articles = json!({
        "id": "pbc_articles",
        "name": "articles",
        "type": "base",
        "system": false,
        "options": {},
        "schema": [
            {
                "id": "f_author",
                "name": "author",
                "type": "relation",
                "system": false,
                "presentable": true,
                "options": {"collectionId": "pbc_users", "maxSelect": 1, "displayFields": ["name"]}
            }
        ],
        "indexes": [],
        "listRule": null
    });
    let (url, state) = spawn_server(vec![articles]).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let op = MigrationOperation::add_index("articles", "CREATE INDEX idx_author ON articles (author)");
    backend.apply_operation(&op).await.unwrap();

    let state = state.lock();
    let stored = &state.collections[0];
    assert_eq!(stored["indexes"][0], "CREATE INDEX idx_author ON articles (author)");
    assert_eq!(stored["system"], false);
    assert_eq!(stored["options"], json!({}));
    let author = &stored["schema"][0];
    assert_eq!(author["presentable"], true);
    assert_eq!(author["system"], false);
    assert_eq!(author["options"]["displayFields"], json!(["name"]));
}

#[tokio::test]
async fn test_fetch_skips_collections_outside_the_model() {
    let collections = vec![
        posts(),
        json!({"id": "pbc_stats", "name": "stats", "type": "view", "schema": [], "options": {"query": "SELECT 1"}}),
        json!({"id": "pbc_pages", "name": "pages", "type": "base", "schema": [{"name": "body", "type": "editor"}]}),
    ];
    let (url, _) = spawn_server(collections).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let schema = backend.fetch_current_schema().await.unwrap();

    let names: Vec<_> = schema.collections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["posts"]);
}

#[tokio::test]
async fn test_create_and_delete_collection() {
    let (url, state) = spawn_server(Vec::new()).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let tags = Collection::new("tags").with_field(Field::new("label", FieldKind::text()));
    backend
        .apply_operation(&MigrationOperation::create_collection(&tags))
        .await
        .unwrap();
    assert_eq!(state.lock().collections.len(), 1);

    let current = backend.fetch_current_schema().await.unwrap();
    let stored = current.get("tags").unwrap();
    assert_eq!(stored.id.as_deref(), Some("pbc_tags"));

    backend
        .apply_operation(&MigrationOperation::delete_collection(stored))
        .await
        .unwrap();
    assert!(state.lock().collections.is_empty());
    assert_eq!(state.lock().requests.last().unwrap(), "DELETE pbc_tags");
}

#[tokio::test]
async fn test_rejection_carries_backend_message() {
    let (url, _) = spawn_server(vec![posts()]).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let err = backend
        .apply_operation(&MigrationOperation::create_collection(&Collection::new("posts")))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BackendError::Rejected {
            status: Some(400),
            message: "Failed to create collection. (name: Collection name must be unique.)".into(),
        }
    );
}

#[tokio::test]
async fn test_missing_collection_is_rejected() {
    let (url, _) = spawn_server(Vec::new()).await;
    let backend = HttpBackend::connect(config(&url)).await.unwrap();

    let op = MigrationOperation::add_field("ghost", &Field::new("x", FieldKind::Bool));
    match backend.apply_operation(&op).await {
        Err(BackendError::Rejected { status, .. }) => assert_eq!(status, Some(404)),
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(config(&format!("http://{}", addr))).unwrap();
    let err = backend.authenticate().await.unwrap_err();

    assert!(matches!(err, BackendError::Unreachable(_)));
}
