#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::Json;
use serde_json::{json, Value};

use kc_client::backend::HttpBackend;
use kc_client::polling::PollConfig;
use kc_client::workflow::ConsoleService;
use kc_core::core::ModelName;

pub const MOCK_MODEL: &str = "gpt-5.1";

// ---------------------------------------------------------------------------
// MockState — in-memory stand-in for the analysis backend's storage
// ---------------------------------------------------------------------------

pub struct StoredVersion {
    pub audio: String,
    pub guide: String,
    pub version: u32,
    pub model: Option<String>,
    pub result: Value,
}

#[derive(Default)]
pub struct MockState {
    pub base_url: String,
    pub records: Vec<Value>,
    pub guides: BTreeMap<String, String>,
    pub blobs: HashMap<String, (Option<String>, Vec<u8>)>,
    pub versions: Vec<StoredVersion>,
    pub analysis_result: Value,
    /// 202 responses served before an artifact turns ready.
    pub pending_polls: u32,
    pub artifact_calls: HashMap<String, u32>,
    pub manual_requests: Vec<Value>,
    pub request_ids: Vec<String>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// MockBackendServer
// ---------------------------------------------------------------------------

pub struct MockBackendServer {
    addr: SocketAddr,
    state: Shared,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockBackendServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));

        let app = axum::Router::new()
            .route("/api/create_upload_url", post(create_upload_url))
            .route("/blob/{*path}", put(put_blob))
            .route("/api/records", get(list_records))
            .route("/api/records/{id}", axum::routing::delete(delete_record))
            .route("/api/records/{id}/metadata", patch(update_metadata))
            .route("/api/records/{id}/transcript", get(get_transcript))
            .route("/api/records/{id}/translation", get(get_translation))
            .route(
                "/api/create_questionnaire_upload_url",
                post(create_guide_upload_url),
            )
            .route("/api/questionnaires", get(list_guides))
            .route(
                "/api/questionnaires/{id}",
                get(get_guide).delete(delete_guide),
            )
            .route("/api/analysis", get(list_versions))
            .route(
                "/api/analysis/{audio}/{guide}",
                get(get_version).delete(delete_versions),
            )
            .route("/api/analysis/{audio}/{guide}/manual", post(save_manual))
            .route("/api/analyze/{audio}/{guide}", post(analyze))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        lock(&state).base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn add_record(&self, audio_id: &str, metadata: Value) {
        self.state().records.push(json!({
            "audioId": audio_id,
            "fileName": format!("{audio_id}.m4a"),
            "metadata": metadata,
        }));
    }

    pub fn add_version(&self, audio: &str, guide: &str, version: u32, result: Value) {
        self.state().versions.push(StoredVersion {
            audio: audio.to_owned(),
            guide: guide.to_owned(),
            version,
            model: Some(MOCK_MODEL.to_owned()),
            result,
        });
    }

    pub fn record(&self, audio_id: &str) -> Option<Value> {
        self.state()
            .records
            .iter()
            .find(|r| r["audioId"] == audio_id)
            .cloned()
    }
}

impl Drop for MockBackendServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(5),
        max_attempts: 20,
    }
}

pub fn http_backend(url: &str) -> HttpBackend {
    HttpBackend::new(url, Duration::from_secs(5)).expect("valid mock url")
}

pub fn console(mock: &MockBackendServer) -> ConsoleService {
    ConsoleService::new(
        Arc::new(http_backend(&mock.url())),
        fast_poll(),
        2,
        ModelName::new(MOCK_MODEL),
    )
}

// ---------------------------------------------------------------------------
// Handlers — recordings
// ---------------------------------------------------------------------------

async fn create_upload_url(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = lock(&state);
    let file_name = body["fileName"].as_str().unwrap_or("audio.bin").to_owned();
    let audio_id = format!("aud-{}", s.records.len() + 1);
    s.records.push(json!({
        "audioId": audio_id,
        "fileName": file_name,
        "metadata": {},
    }));
    Json(json!({
        "uploadUrl": format!("{}/blob/audio/{audio_id}?sig=test", s.base_url),
        "audioId": audio_id,
        "blobName": file_name,
    }))
    .into_response()
}

async fn put_blob(
    State(state): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let blob_type = headers
        .get("x-ms-blob-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if blob_type.as_deref() != Some("BlockBlob") {
        return (StatusCode::BAD_REQUEST, "missing x-ms-blob-type").into_response();
    }

    let mut s = lock(&state);
    if let Some(name) = path.strip_prefix("guides/") {
        s.guides
            .insert(name.to_owned(), String::from_utf8_lossy(&body).into_owned());
    }
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    s.blobs.insert(path, (content_type, body.to_vec()));
    StatusCode::CREATED.into_response()
}

async fn list_records(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = lock(&state);
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        s.request_ids.push(id.to_owned());
    }
    Json(json!({ "records": s.records })).into_response()
}

async fn delete_record(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut s = lock(&state);
    let before = s.records.len();
    s.records.retain(|r| r["audioId"] != id.as_str());
    if s.records.len() == before {
        return (StatusCode::NOT_FOUND, "record not found").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn update_metadata(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    let mut s = lock(&state);
    let Some(record) = s.records.iter_mut().find(|r| r["audioId"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, "record not found").into_response();
    };
    if let (Some(target), Some(fields)) = (
        record["metadata"].as_object_mut(),
        patch.as_object(),
    ) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    StatusCode::OK.into_response()
}

fn artifact_response(state: &Shared, id: &str, kind: &str) -> Response {
    let mut s = lock(state);
    if !s.records.iter().any(|r| r["audioId"] == id) {
        return (StatusCode::NOT_FOUND, "record not found").into_response();
    }
    let pending = s.pending_polls;
    let calls = s.artifact_calls.entry(format!("{id}/{kind}")).or_insert(0);
    *calls += 1;
    if *calls <= pending {
        return (StatusCode::ACCEPTED, Json(json!({"status": "pending"}))).into_response();
    }
    match kind {
        "transcript" => Json(json!({ "audioId": id, "text": format!("transcript of {id}") }))
            .into_response(),
        _ => (StatusCode::OK, format!("translation of {id}")).into_response(),
    }
}

async fn get_transcript(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    artifact_response(&state, &id, "transcript")
}

async fn get_translation(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    artifact_response(&state, &id, "translation")
}

// ---------------------------------------------------------------------------
// Handlers — guides
// ---------------------------------------------------------------------------

async fn create_guide_upload_url(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let s = lock(&state);
    let name = body["name"].as_str().unwrap_or("guide").to_owned();
    Json(json!({
        "uploadUrl": format!("{}/blob/guides/{name}?sig=test", s.base_url),
        "questionnaireId": name,
    }))
    .into_response()
}

async fn list_guides(State(state): State<Shared>) -> Response {
    let s = lock(&state);
    let guides: Vec<Value> = s
        .guides
        .keys()
        .map(|id| json!({ "id": id, "name": format!("Guide {id}") }))
        .collect();
    Json(guides).into_response()
}

async fn get_guide(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match lock(&state).guides.get(&id) {
        Some(body) => (StatusCode::OK, body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, format!("questionnaire {id} not found")).into_response(),
    }
}

async fn delete_guide(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match lock(&state).guides.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => (StatusCode::NOT_FOUND, "questionnaire not found").into_response(),
    }
}

// ---------------------------------------------------------------------------
// Handlers — analysis
// ---------------------------------------------------------------------------

fn version_json(v: &StoredVersion) -> Value {
    json!({
        "audioId": v.audio,
        "questionnaireId": v.guide,
        "version": v.version,
        "blobName": format!("{}/{}/v{}.json", v.audio, v.guide, v.version),
        "size": 128,
    })
}

fn payload_json(v: &StoredVersion) -> Value {
    json!({
        "audioId": v.audio,
        "questionnaireId": v.guide,
        "version": v.version,
        "model": v.model,
        "result": v.result,
    })
}

fn next_version(s: &MockState, audio: &str, guide: &str) -> u32 {
    s.versions
        .iter()
        .filter(|v| v.audio == audio && v.guide == guide)
        .map(|v| v.version)
        .max()
        .unwrap_or(0)
        + 1
}

async fn list_versions(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let s = lock(&state);
    let audio = params.get("audioId").cloned().unwrap_or_default();
    let guide = params.get("questionnaireId").cloned().unwrap_or_default();
    let versions: Vec<Value> = s
        .versions
        .iter()
        .filter(|v| v.audio == audio && v.guide == guide)
        .map(version_json)
        .collect();
    Json(json!({ "versions": versions })).into_response()
}

async fn get_version(
    State(state): State<Shared>,
    Path((audio, guide)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let s = lock(&state);
    let mut matching: Vec<&StoredVersion> = s
        .versions
        .iter()
        .filter(|v| v.audio == audio && v.guide == guide)
        .collect();
    matching.sort_by_key(|v| std::cmp::Reverse(v.version));

    let found = match params.get("version").and_then(|v| v.parse::<u32>().ok()) {
        Some(n) => matching.into_iter().find(|v| v.version == n),
        None => matching.into_iter().next(),
    };
    match found {
        Some(v) => Json(payload_json(v)).into_response(),
        None => (StatusCode::NOT_FOUND, "version not found").into_response(),
    }
}

async fn delete_versions(
    State(state): State<Shared>,
    Path((audio, guide)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut s = lock(&state);
    let before = s.versions.len();
    let only = params.get("version").and_then(|v| v.parse::<u32>().ok());
    s.versions.retain(|v| {
        let pair = v.audio == audio && v.guide == guide;
        !(pair && only.map_or(true, |n| v.version == n))
    });
    if s.versions.len() == before {
        return (StatusCode::NOT_FOUND, "no versions").into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn analyze(
    State(state): State<Shared>,
    Path((audio, guide)): Path<(String, String)>,
) -> Response {
    let mut s = lock(&state);
    let version = next_version(&s, &audio, &guide);
    let stored = StoredVersion {
        audio,
        guide,
        version,
        model: Some(MOCK_MODEL.to_owned()),
        result: s.analysis_result.clone(),
    };
    let body = payload_json(&stored);
    s.versions.push(stored);
    Json(body).into_response()
}

async fn save_manual(
    State(state): State<Shared>,
    Path((audio, guide)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = lock(&state);
    let version = next_version(&s, &audio, &guide);
    s.versions.push(StoredVersion {
        audio,
        guide,
        version,
        model: body["model"].as_str().map(str::to_owned),
        result: body["result"].clone(),
    });
    s.manual_requests.push(body);
    Json(json!({ "version": version })).into_response()
}
