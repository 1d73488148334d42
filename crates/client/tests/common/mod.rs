//! In-process fake of the workflow service, served by axum on an
//! ephemeral port.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use cellflow_client::config::ClientConfig;

/// Shared state of the fake service.
///
/// Counters record how often each endpoint was hit; the remaining
/// fields script the replies.
#[derive(Default)]
pub struct FakeService {
    pub uploads: AtomicUsize,
    pub model_fetches: AtomicUsize,
    pub submissions: AtomicUsize,
    pub status_fetches: AtomicUsize,

    /// Released once per gated submission.
    pub submit_gate: Notify,
    gate_submissions: AtomicBool,
    omit_workflow_id: AtomicBool,

    upload_status: Mutex<Option<StatusCode>>,
    upload_filename: Mutex<Option<Value>>,
    models_status: Mutex<Option<StatusCode>>,
    models: Mutex<Vec<Value>>,
    last_model_type: Mutex<Option<String>>,
    next_workflow_id: Mutex<String>,
    last_submission: Mutex<Option<Value>>,
    statuses: Mutex<HashMap<String, VecDeque<Value>>>,
    status_failures: Mutex<HashMap<String, StatusCode>>,
    listing: Mutex<Vec<Value>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        let service = Self::default();
        *service.next_workflow_id.lock().unwrap() = "wf-1".to_string();
        Arc::new(service)
    }

    pub fn with_models(self: &Arc<Self>, models: Vec<Value>) -> &Arc<Self> {
        *self.models.lock().unwrap() = models;
        self
    }

    pub fn fail_models(self: &Arc<Self>, status: Option<StatusCode>) -> &Arc<Self> {
        *self.models_status.lock().unwrap() = status;
        self
    }

    pub fn fail_uploads(self: &Arc<Self>, status: StatusCode) -> &Arc<Self> {
        *self.upload_status.lock().unwrap() = Some(status);
        self
    }

    /// Override the `filename` field of upload replies.
    pub fn upload_reply_filename(self: &Arc<Self>, filename: Value) -> &Arc<Self> {
        *self.upload_filename.lock().unwrap() = Some(filename);
        self
    }

    pub fn gate_submissions(self: &Arc<Self>) -> &Arc<Self> {
        self.gate_submissions.store(true, Ordering::SeqCst);
        self
    }

    /// Answer submissions with an empty JSON object.
    pub fn omit_workflow_id(self: &Arc<Self>) -> &Arc<Self> {
        self.omit_workflow_id.store(true, Ordering::SeqCst);
        self
    }

    /// Answer every `GET /workflows/{id}` for `workflow_id` with `status`.
    pub fn fail_status(self: &Arc<Self>, workflow_id: &str, status: StatusCode) -> &Arc<Self> {
        self.status_failures
            .lock()
            .unwrap()
            .insert(workflow_id.to_string(), status);
        self
    }

    /// Replies for `GET /workflows/{id}`; the last one repeats.
    pub fn script_status(self: &Arc<Self>, workflow_id: &str, replies: Vec<Value>) -> &Arc<Self> {
        self.statuses
            .lock()
            .unwrap()
            .insert(workflow_id.to_string(), replies.into());
        self
    }

    pub fn with_listing(self: &Arc<Self>, listing: Vec<Value>) -> &Arc<Self> {
        *self.listing.lock().unwrap() = listing;
        self
    }

    pub fn last_submission(&self) -> Option<Value> {
        self.last_submission.lock().unwrap().clone()
    }

    pub fn last_model_type(&self) -> Option<String> {
        self.last_model_type.lock().unwrap().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Serve `service` on `127.0.0.1:0` and return a client config for it.
pub async fn spawn(service: Arc<FakeService>) -> ClientConfig {
    let app = Router::new()
        .nest("/api/v1", routes())
        .with_state(service);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ClientConfig {
        base_url: format!("http://{addr}/api/v1"),
        request_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

/// A config pointing at a port nothing listens on.
pub fn unreachable_config() -> ClientConfig {
    ClientConfig {
        base_url: "http://127.0.0.1:9/api/v1".to_string(),
        request_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    }
}

fn routes() -> Router<Arc<FakeService>> {
    Router::new()
        .route("/upload", post(upload))
        .route("/models", get(models))
        .route("/workflows", get(list_workflows))
        .route("/workflows/single-cell", post(create_workflow))
        .route("/workflows/{id}", get(get_workflow))
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn upload(State(fake): State<Arc<FakeService>>, mut multipart: Multipart) -> Response {
    fake.uploads.fetch_add(1, Ordering::SeqCst);

    let mut received = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.unwrap_or_default();
            received = Some((name, bytes.len()));
        }
    }

    if let Some(status) = *fake.upload_status.lock().unwrap() {
        return detail(status, "upload refused");
    }
    let Some((name, _)) = received else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "missing file part");
    };

    let filename = fake
        .upload_filename
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| json!(format!("uploaded-{name}")));
    Json(json!({ "filename": filename })).into_response()
}

async fn models(
    State(fake): State<Arc<FakeService>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    fake.model_fetches.fetch_add(1, Ordering::SeqCst);
    let model_type = query.get("model_type").cloned();
    *fake.last_model_type.lock().unwrap() = model_type.clone();

    if let Some(status) = *fake.models_status.lock().unwrap() {
        return detail(status, "models unavailable");
    }

    let models: Vec<Value> = fake
        .models
        .lock()
        .unwrap()
        .iter()
        .filter(|m| match &model_type {
            Some(t) => m["type"].as_str() == Some(t.as_str()),
            None => true,
        })
        .cloned()
        .collect();
    Json(json!({ "models": models })).into_response()
}

async fn create_workflow(
    State(fake): State<Arc<FakeService>>,
    Json(body): Json<Value>,
) -> Response {
    fake.submissions.fetch_add(1, Ordering::SeqCst);
    *fake.last_submission.lock().unwrap() = Some(body);

    if fake.gate_submissions.load(Ordering::SeqCst) {
        fake.submit_gate.notified().await;
    }

    if fake.omit_workflow_id.load(Ordering::SeqCst) {
        return Json(json!({})).into_response();
    }
    let id = fake.next_workflow_id.lock().unwrap().clone();
    Json(json!({ "workflow_id": id, "status": "created" })).into_response()
}

async fn get_workflow(State(fake): State<Arc<FakeService>>, Path(id): Path<String>) -> Response {
    fake.status_fetches.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = fake.status_failures.lock().unwrap().get(&id).copied() {
        return detail(status, "request refused");
    }

    let reply = {
        let mut statuses = fake.statuses.lock().unwrap();
        statuses.get_mut(&id).and_then(|replies| {
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        })
    };

    match reply {
        Some(body) => Json(body).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Workflow not found"),
    }
}

async fn list_workflows(State(fake): State<Arc<FakeService>>) -> Response {
    Json(Value::Array(fake.listing.lock().unwrap().clone())).into_response()
}
