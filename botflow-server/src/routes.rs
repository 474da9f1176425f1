//! HTTP endpoints for the push and compile-trigger contracts.
//!
//! The push endpoint receives function/parameter definitions from an
//! external authority (API key + scope id in headers, PascalCase body) and
//! runs a reconciliation pass. The compile endpoint fetches the persisted
//! graph and the catalog for a scope and serves the compiled instruction
//! set to the execution engine.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use botflow_core::{
    compile, load_snapshot, CatalogStore, FunctionDef, GraphDocument, ParamDef, ParseError,
    ReconcileError, Reconciler,
};

const API_KEY_HEADER: &str = "x-api-key";
const SCOPE_ID_HEADER: &str = "x-scope-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub reconciler: Arc<Reconciler>,
    pub api_key: String,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, api_key: String) -> AppState {
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&store)));
        AppState {
            store,
            reconciler,
            api_key,
        }
    }
}

// ── Wire types ──

/// Push body entry, in the external authority's casing.
#[derive(Debug, Deserialize)]
pub struct PushFunction {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default)]
    pub parameters: Vec<PushParameter>,
}

#[derive(Debug, Deserialize)]
pub struct PushParameter {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type")]
    pub ty: String,
}

impl From<PushFunction> for FunctionDef {
    fn from(p: PushFunction) -> FunctionDef {
        FunctionDef {
            name: p.name,
            description: p.description,
            parameters: p
                .parameters
                .into_iter()
                .map(|q| ParamDef {
                    name: q.name,
                    ty: q.ty,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub id: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn reply(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

// ── Handlers ──

async fn health() -> &'static str {
    "ok"
}

/// POST /api/functions/push
async fn push_functions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(batch): Json<Vec<PushFunction>>,
) -> Response {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.api_key {
        return reply(StatusCode::FORBIDDEN, "missing or invalid api key");
    }

    let Some(scope_id) = headers
        .get(SCOPE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
    else {
        return reply(StatusCode::NOT_FOUND, "unknown scope");
    };

    let incoming: Vec<FunctionDef> = batch.into_iter().map(FunctionDef::from).collect();
    match state.reconciler.reconcile(scope_id, incoming).await {
        Ok(report) => {
            info!(scope = %scope_id, created = report.created.len(),
                updated = report.updated.len(), "function push reconciled");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e @ (ReconcileError::EmptyBatch | ReconcileError::DuplicateName { .. })) => {
            reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ ReconcileError::UnknownScope(_)) => reply(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            warn!(scope = %scope_id, error = %e, "function push failed");
            reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /api/compile
async fn trigger_compile(
    State(state): State<AppState>,
    Json(req): Json<CompileRequest>,
) -> Response {
    if req.key != state.api_key {
        return reply(StatusCode::FORBIDDEN, "missing or invalid api key");
    }
    if req.id.trim().is_empty() {
        return reply(StatusCode::BAD_REQUEST, "empty scope id");
    }
    let Ok(scope_id) = Uuid::parse_str(req.id.trim()) else {
        return reply(StatusCode::BAD_REQUEST, "malformed scope id");
    };

    let snapshot = match load_snapshot(state.store.as_ref(), scope_id).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return reply(StatusCode::NOT_FOUND, "scope not found"),
        Err(e) => return reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let blob = match state.store.graph_blob(scope_id).await {
        Ok(blob) => blob,
        Err(e) => return reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    // A scope whose graph was never saved compiles as a blank document.
    let doc = match blob.as_deref().map(GraphDocument::parse) {
        None | Some(Err(ParseError::Empty)) => GraphDocument::empty(),
        Some(Err(e @ ParseError::Corrupt(_))) => {
            return reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        Some(Ok(doc)) => doc,
    };

    match compile(&doc, &snapshot) {
        Ok(set) => {
            info!(scope = %scope_id, states = set.states.len(),
                transitions = set.transitions.len(), "instruction set compiled");
            (StatusCode::OK, Json(set)).into_response()
        }
        Err(e) => reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/functions/push", post(push_functions))
        .route("/api/compile", post(trigger_compile))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use botflow_core::{Job, MemoryCatalog};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const KEY: &str = "secret-key";

    async fn app() -> (Router, Arc<MemoryCatalog>, Job) {
        let store = Arc::new(MemoryCatalog::new());
        let job = Job {
            id: Uuid::now_v7(),
            title: "Demo worker".into(),
            owner: "scope-owner".into(),
        };
        store.add_job(job.clone()).await;
        let state = AppState::new(Arc::clone(&store) as Arc<dyn CatalogStore>, KEY.into());
        (router(state), store, job)
    }

    fn push_request(key: &str, scope: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/functions/push")
            .header("content-type", "application/json")
            .header(API_KEY_HEADER, key)
            .header(SCOPE_ID_HEADER, scope)
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn compile_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/compile")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn push_with_wrong_key_is_forbidden() {
        let (app, _, job) = app().await;
        let res = app
            .oneshot(push_request(
                "wrong",
                &job.id.to_string(),
                json!([{"Name": "Fetch"}]),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn push_with_unknown_scope_is_not_found() {
        let (app, _, _) = app().await;
        let res = app
            .oneshot(push_request(
                KEY,
                &Uuid::now_v7().to_string(),
                json!([{"Name": "Fetch"}]),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn push_with_empty_batch_is_bad_request() {
        let (app, _, job) = app().await;
        let res = app
            .oneshot(push_request(KEY, &job.id.to_string(), json!([])))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn push_creates_functions_and_reports_them() {
        let (app, store, job) = app().await;
        let res = app
            .oneshot(push_request(
                KEY,
                &job.id.to_string(),
                json!([
                    {"Name": "start"},
                    {"Name": "exit"},
                    {"Name": "Fetch", "Parameters": [{"Name": "url", "Type": "text"}]}
                ]),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["created"], json!(["Fetch", "exit", "start"]));
        assert_eq!(store.functions(job.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn compile_with_wrong_key_is_forbidden() {
        let (app, _, job) = app().await;
        let res = app
            .oneshot(compile_request(
                json!({"id": job.id.to_string(), "key": "nope"}),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn compile_with_empty_id_is_bad_request() {
        let (app, _, _) = app().await;
        let res = app
            .oneshot(compile_request(json!({"id": "", "key": KEY})))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn compile_with_unknown_scope_is_not_found() {
        let (app, _, _) = app().await;
        let res = app
            .oneshot(compile_request(
                json!({"id": Uuid::now_v7().to_string(), "key": KEY}),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn compile_without_start_function_is_server_error_with_message() {
        let (app, store, job) = app().await;
        store
            .put_graph(job.id, br#"{"nodes": [], "edges": []}"#.to_vec())
            .await;
        // Catalog has neither start nor exit.
        let res = app
            .oneshot(compile_request(
                json!({"id": job.id.to_string(), "key": KEY}),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        let msg = body["error"].as_str().unwrap();
        assert!(msg.contains("No start function found"));
        assert!(msg.contains("No exit function found"));
    }

    #[tokio::test]
    async fn compile_serves_the_artifact() {
        let (app, store, job) = app().await;
        store
            .put_graph(
                job.id,
                br#"{
                  "nodes": [
                    {"id": "a", "type": "start", "data": {"label": "start"}},
                    {"id": "b", "type": "exit", "data": {"label": "exit"}}
                  ],
                  "edges": [
                    {"id": "e", "source": "a", "target": "b",
                     "sourceHandle": "t1", "targetHandle": "in"}
                  ]
                }"#
                .to_vec(),
            )
            .await;

        // Seed the catalog through the push endpoint.
        let push = app
            .clone()
            .oneshot(push_request(
                KEY,
                &job.id.to_string(),
                json!([{"Name": "start"}, {"Name": "exit"}]),
            ))
            .await
            .expect("push");
        assert_eq!(push.status(), StatusCode::OK);

        let res = app
            .oneshot(compile_request(
                json!({"id": job.id.to_string(), "key": KEY}),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["name"], "Demo worker");
        assert_eq!(body["states"][0]["type"], "fallback");
        assert_eq!(body["states"][1]["type"], "start");
        assert_eq!(
            body["transitions"],
            json!([{"from": "start", "to": "exit", "outcome": 1}])
        );
    }

    #[tokio::test]
    async fn corrupt_stored_graph_is_bad_request() {
        let (app, store, job) = app().await;
        store.put_graph(job.id, b"{broken".to_vec()).await;
        let push = app
            .clone()
            .oneshot(push_request(
                KEY,
                &job.id.to_string(),
                json!([{"Name": "start"}, {"Name": "exit"}]),
            ))
            .await
            .expect("push");
        assert_eq!(push.status(), StatusCode::OK);

        let res = app
            .oneshot(compile_request(
                json!({"id": job.id.to_string(), "key": KEY}),
            ))
            .await
            .expect("response");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
