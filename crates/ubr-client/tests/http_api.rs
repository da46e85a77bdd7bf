//! `HttpApi` against a stub of the builder plugin's REST routes.
//!
//! The stub records method, full path, nonce header, and JSON body of every
//! request so the tests can pin the wire contract: paths, verbs, the
//! `X-WP-Nonce` header, and numeric ids in `block_id` / `block_order`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use ubr_client::{
    AddOutcome, ApiError, BlocksApi, ClientConfig, HttpApi, LoadOutcome, PageSectionStore,
    StoreError,
};
use ubr_types::{BlockId, PageId, SectionId};

// ============================================================================
// Stub host
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Seen {
    method: &'static str,
    path: String,
    nonce: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Stub {
    seen: Arc<Mutex<Vec<Seen>>>,
    /// Delay on `GET /blocks`, to exercise the client timeout.
    slow_catalog: Option<Duration>,
}

impl Stub {
    fn record(&self, method: &'static str, uri: &OriginalUri, headers: &HeaderMap, body: Value) {
        self.seen.lock().push(Seen {
            method,
            path: uri.0.path().to_string(),
            nonce: headers
                .get("x-wp-nonce")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

async fn list_blocks(State(stub): State<Stub>, uri: OriginalUri, headers: HeaderMap) -> Response {
    stub.record("GET", &uri, &headers, Value::Null);
    if let Some(delay) = stub.slow_catalog {
        tokio::time::sleep(delay).await;
    }
    Json(json!([
        {"id": 3, "name": "Hero", "description": "Big banner", "image": "/hero.png"},
        {"id": "4", "name": "Feature Grid"}
    ]))
    .into_response()
}

async fn add_to_page(
    State(stub): State<Stub>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(_page): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", &uri, &headers, body.clone());
    if body["block_id"] == json!(4) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "could not add block").into_response();
    }
    Json(json!({"message": "Block added"})).into_response()
}

async fn page_blocks(
    State(stub): State<Stub>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(_page): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", &uri, &headers, body);
    Json(json!([
        {"id": "5", "name": "Hero", "description": null, "image": null, "order": "2"},
        {"id": 9, "name": "Footer", "order": 1},
        {"id": 7, "name": "Feature  Grid", "order": 3}
    ]))
    .into_response()
}

async fn delete_block(
    State(stub): State<Stub>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(section): Path<String>,
) -> Response {
    stub.record("DELETE", &uri, &headers, Value::Null);
    if section == "9" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "delete failed").into_response();
    }
    Json(json!({"success": true})).into_response()
}

async fn reorder(
    State(stub): State<Stub>,
    uri: OriginalUri,
    headers: HeaderMap,
    Path(_page): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    stub.record("POST", &uri, &headers, body);
    StatusCode::OK.into_response()
}

async fn serve(stub: Stub) -> SocketAddr {
    let routes = Router::new()
        .route("/blocks", get(list_blocks))
        .route("/blocks/add-to-page/:page_id", post(add_to_page))
        .route("/page-blocks/:page_id", post(page_blocks))
        .route("/page-blocks-delete/:block_id", delete(delete_block))
        .route("/page-blocks-reorder/:page_id", post(reorder));
    let app = Router::new()
        .nest("/wp-json/unicorn-builder/v1", routes)
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_config(addr: SocketAddr, token: &str) -> ClientConfig {
    ClientConfig {
        auth_token: token.to_string(),
        ..ClientConfig::new(format!("http://{addr}"), PageId::new(42))
    }
}

async fn setup(token: &str) -> (Stub, HttpApi, ClientConfig) {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;
    let config = client_config(addr, token);
    let api = HttpApi::new(&config).unwrap();
    (stub, api, config)
}

const BASE: &str = "/wp-json/unicorn-builder/v1";

// ============================================================================
// Wire contract
// ============================================================================

#[tokio::test]
async fn test_catalog_decodes_mixed_ids() {
    let (stub, api, _) = setup("n0nce").await;

    let blocks = api.list_blocks().await.unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].id, BlockId::from("3"));
    assert_eq!(blocks[1].id, BlockId::from("4"));
    assert_eq!(blocks[0].image.as_deref(), Some("/hero.png"));

    assert_eq!(
        stub.seen(),
        vec![Seen {
            method: "GET",
            path: format!("{BASE}/blocks"),
            nonce: Some("n0nce".into()),
            body: Value::Null,
        }]
    );
}

#[tokio::test]
async fn test_load_posts_empty_object_and_sorts() {
    let (stub, api, config) = setup("n0nce").await;
    let store = PageSectionStore::new(Arc::new(api), &config);

    assert_eq!(store.load().await.unwrap(), LoadOutcome::Loaded { count: 3 });
    assert_eq!(
        store.ids(),
        vec![SectionId::from("9"), SectionId::from("5"), SectionId::from("7")]
    );
    assert_eq!(store.sections()[2].kind, "feature-grid");

    let seen = stub.seen();
    assert_eq!(seen[0].path, format!("{BASE}/page-blocks/42"));
    assert_eq!(seen[0].body, json!({}));
}

#[tokio::test]
async fn test_reorder_sends_numeric_block_order() {
    let (stub, api, config) = setup("n0nce").await;
    let store = PageSectionStore::new(Arc::new(api), &config);
    store.load().await.unwrap();

    store
        .reorder(vec![SectionId::from("7"), SectionId::from("9"), SectionId::from("5")])
        .await
        .unwrap();

    let last = stub.seen().pop().unwrap();
    assert_eq!(last.method, "POST");
    assert_eq!(last.path, format!("{BASE}/page-blocks-reorder/42"));
    assert_eq!(last.body, json!({"block_order": [7, 9, 5]}));
}

#[tokio::test]
async fn test_add_posts_each_block_in_order() {
    let (stub, api, config) = setup("n0nce").await;
    let store = PageSectionStore::new(Arc::new(api), &config);

    let outcome = store
        .add(&[BlockId::from("3"), BlockId::from("4")])
        .await
        .unwrap();

    match outcome {
        AddOutcome::PartialFailure { succeeded, failed } => {
            assert_eq!(succeeded, vec![BlockId::from("3")]);
            assert_eq!(failed[0].block_id, BlockId::from("4"));
            assert_eq!(failed[0].error.status(), Some(500));
        }
        other => panic!("expected partial failure, got {other:?}"),
    }

    let bodies: Vec<(String, Value)> =
        stub.seen().into_iter().map(|s| (s.path, s.body)).collect();
    assert_eq!(
        bodies,
        vec![
            (format!("{BASE}/blocks/add-to-page/42"), json!({"block_id": 3})),
            (format!("{BASE}/blocks/add-to-page/42"), json!({"block_id": 4})),
        ]
    );
}

#[tokio::test]
async fn test_failed_delete_reports_status_and_reloads() {
    let (stub, api, config) = setup("n0nce").await;
    let store = PageSectionStore::new(Arc::new(api), &config);
    store.load().await.unwrap();

    let err = store.remove(&SectionId::from("9")).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::Api(ApiError::Status {
            status: 500,
            body: "delete failed".into(),
        })
    );
    assert!(store.get(&SectionId::from("9")).is_some());

    let calls: Vec<(&str, String)> = stub.seen().into_iter().map(|s| (s.method, s.path)).collect();
    assert_eq!(
        calls,
        vec![
            ("POST", format!("{BASE}/page-blocks/42")),
            ("DELETE", format!("{BASE}/page-blocks-delete/9")),
            ("POST", format!("{BASE}/page-blocks/42")),
        ]
    );
}

#[tokio::test]
async fn test_missing_token_is_sent_empty() {
    let (stub, api, _) = setup("").await;
    api.delete_page_block(&SectionId::from("5")).await.unwrap();
    assert_eq!(stub.seen()[0].nonce.as_deref(), Some(""));
}

#[tokio::test]
async fn test_slow_host_times_out() {
    let stub = Stub {
        slow_catalog: Some(Duration::from_secs(5)),
        ..Stub::default()
    };
    let addr = serve(stub).await;
    let config = ClientConfig {
        request_timeout_secs: 1,
        ..client_config(addr, "n0nce")
    };
    let api = HttpApi::new(&config).unwrap();

    assert_eq!(
        api.list_blocks().await,
        Err(ApiError::Timeout(Duration::from_secs(1)))
    );
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpApi::new(&client_config(addr, "n0nce")).unwrap();
    assert!(matches!(
        api.page_blocks(PageId::new(42)).await,
        Err(ApiError::Transport(_))
    ));
}
