// Stub control plane serving the snapshot endpoint for integration tests.
use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum StubResponse {
    /// 200 with the given object wrapped as `{"snapshot": ...}`.
    Snapshot(Value),
    /// 200 with a JSON body that has no `snapshot` field.
    MissingSnapshotField,
    /// 200 with a body that is not JSON at all.
    Raw(&'static str),
    /// The given status code with an empty body.
    Status(u16),
}

pub struct StubControlPlane {
    hits: AtomicU64,
    last_request_id: Mutex<Option<String>>,
    last_project_id: Mutex<Option<String>>,
    response: Mutex<StubResponse>,
    delay: Mutex<Option<Duration>>,
}

impl StubControlPlane {
    pub fn new(response: StubResponse) -> Arc<Self> {
        Arc::new(Self {
            hits: AtomicU64::new(0),
            last_request_id: Mutex::new(None),
            last_project_id: Mutex::new(None),
            response: Mutex::new(response),
            delay: Mutex::new(None),
        })
    }

    pub fn set_response(&self, response: StubResponse) {
        *self.response.lock().expect("lock") = response;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("lock") = Some(delay);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request_id(&self) -> Option<String> {
        self.last_request_id.lock().expect("lock").clone()
    }

    pub fn last_project_id(&self) -> Option<String> {
        self.last_project_id.lock().expect("lock").clone()
    }

    /// Bind an ephemeral port, serve the snapshot route, return the base URL.
    pub async fn serve(self: &Arc<Self>) -> String {
        let app = Router::new()
            .route("/api/internal/snapshot", get(snapshot_handler))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }
}

async fn snapshot_handler(
    State(stub): State<Arc<StubControlPlane>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(value) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        *stub.last_request_id.lock().expect("lock") = Some(value.to_string());
    }
    if let Some(project_id) = params.get("project_id") {
        *stub.last_project_id.lock().expect("lock") = Some(project_id.clone());
    }
    let delay = *stub.delay.lock().expect("lock");
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let response = stub.response.lock().expect("lock");
    match &*response {
        StubResponse::Snapshot(snapshot) => Json(json!({ "snapshot": snapshot })).into_response(),
        StubResponse::MissingSnapshotField => Json(json!({ "ok": true })).into_response(),
        StubResponse::Raw(body) => (StatusCode::OK, *body).into_response(),
        StubResponse::Status(code) => StatusCode::from_u16(*code)
            .expect("status code")
            .into_response(),
    }
}

/// Active project with realtime and storage enabled.
pub fn active_snapshot(version: &str, realtime_limit: Option<u64>) -> Value {
    json!({
        "version": version,
        "project": { "status": "ACTIVE", "environment": "live" },
        "services": {
            "realtime": { "enabled": true },
            "storage": { "enabled": true }
        },
        "quotas": { "realtime_connections": realtime_limit }
    })
}

/// Active project with a storage operation quota.
pub fn storage_snapshot(version: &str, storage_quota: Option<u64>) -> Value {
    json!({
        "version": version,
        "project": { "status": "ACTIVE" },
        "services": {
            "realtime": { "enabled": true },
            "storage": { "enabled": true }
        },
        "quotas": { "storage_operations": storage_quota }
    })
}
