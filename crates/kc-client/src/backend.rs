use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use kc_core::core::{
    AnalysisPayload, AnalysisVersion, ArtifactKind, ArtifactStatus, AudioId, AudioRecord,
    BackendFuture, ConfigError, ConsoleBackend, ConsoleError, DeleteOutcome, DeleteScope, GuideId,
    GuideSummary, GuideUploadTicket, ManualVersionRequest, RecordMetadata, TransportError,
    UploadTicket, VersionNumber, VersionSelector,
};

use crate::bootstrap::validate_base_url;

pub const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";
pub const BLOCK_BLOB: &str = "BlockBlob";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ---------------------------------------------------------------------------
// HttpBackend — reqwest adapter for the analysis backend
// ---------------------------------------------------------------------------

pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConsoleError> {
        let validated = validate_base_url(Some(base_url))?;
        let base = Url::parse(&validated)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidBaseUrl(validated.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection {
                url: validated,
                message: e.to_string(),
            })?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: &Url) -> reqwest::RequestBuilder {
        let request_id = Uuid::new_v4();
        tracing::debug!(%method, %url, %request_id, "backend request");
        self.client
            .request(method, url.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

async fn send(
    request: reqwest::RequestBuilder,
    url: &Url,
) -> Result<reqwest::Response, TransportError> {
    request.send().await.map_err(|e| TransportError::Connection {
        url: url.to_string(),
        message: e.to_string(),
    })
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

async fn read_body(resp: reqwest::Response) -> Result<String, TransportError> {
    resp.text()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, TransportError> {
    let body = read_body(resp).await?;
    serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Empty bodies decode to `T::default()`.
async fn read_json_or_default<T: DeserializeOwned + Default>(
    resp: reqwest::Response,
) -> Result<T, TransportError> {
    let body = read_body(resp).await?;
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
}

async fn delete_outcome(
    resp: reqwest::Response,
    url: &Url,
) -> Result<DeleteOutcome, TransportError> {
    if resp.status() == StatusCode::NOT_FOUND {
        tracing::info!(%url, "delete target already absent");
        return Ok(DeleteOutcome::AlreadyAbsent);
    }
    ensure_success(resp).await?;
    Ok(DeleteOutcome::Deleted)
}

/// Accepts a bare JSON array or an object holding the array under `key`.
pub(crate) fn decode_listing<T: DeserializeOwned>(
    value: Value,
    key: &str,
) -> Result<Vec<T>, TransportError> {
    let items = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove(key)
            .or_else(|| map.remove("items"))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => {
            return Err(TransportError::Decode(format!(
                "expected a list of {key}, got {other}"
            )))
        }
    };
    serde_json::from_value(items).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Transcript bodies are plain text or a JSON wrapper around it.
pub(crate) fn artifact_text(body: String) -> String {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => ["text", "transcript", "translation", "content"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_owned))
            .unwrap_or(body),
        Ok(Value::String(text)) => text,
        _ => body,
    }
}

/// Guide listings carry either bare ids or summary objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum GuideSummaryWire {
    Id(GuideId),
    Full(GuideSummary),
}

impl From<GuideSummaryWire> for GuideSummary {
    fn from(wire: GuideSummaryWire) -> Self {
        match wire {
            GuideSummaryWire::Id(id) => GuideSummary {
                id,
                name: None,
                size: None,
                last_modified: None,
            },
            GuideSummaryWire::Full(summary) => summary,
        }
    }
}

fn version_query(selector: VersionSelector) -> (&'static str, String) {
    match selector {
        VersionSelector::Latest => ("latest", "true".to_owned()),
        VersionSelector::Exact(v) => ("version", v.value().to_string()),
    }
}

// ---------------------------------------------------------------------------
// ConsoleBackend implementation
// ---------------------------------------------------------------------------

impl ConsoleBackend for HttpBackend {
    fn create_upload_url<'a>(
        &'a self,
        file_name: &'a str,
        content_type: &'a str,
    ) -> BackendFuture<'a, UploadTicket> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "create_upload_url"]);
            let body = serde_json::json!({
                "fileName": file_name,
                "contentType": content_type,
            });
            let resp = send(self.request(Method::POST, &url).json(&body), &url).await?;
            read_json(ensure_success(resp).await?).await
        })
    }

    fn upload_blob<'a>(
        &'a self,
        upload_url: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let url = Url::parse(upload_url)
                .map_err(|e| TransportError::Decode(format!("invalid upload URL: {e}")))?;
            tracing::debug!(host = url.host_str().unwrap_or(""), size = bytes.len(), "blob upload");
            let request = self
                .client
                .put(url.clone())
                .header(BLOB_TYPE_HEADER, BLOCK_BLOB)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes);
            ensure_success(send(request, &url).await?).await?;
            Ok(())
        })
    }

    fn list_records(&self) -> BackendFuture<'_, Vec<AudioRecord>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "records"]);
            let resp = send(self.request(Method::GET, &url), &url).await?;
            let value: Value = read_json_or_default(ensure_success(resp).await?).await?;
            decode_listing(value, "records")
        })
    }

    fn delete_record<'a>(&'a self, audio: &'a AudioId) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "records", audio.as_str()]);
            let resp = send(self.request(Method::DELETE, &url), &url).await?;
            delete_outcome(resp, &url).await
        })
    }

    fn update_metadata<'a>(
        &'a self,
        audio: &'a AudioId,
        patch: &'a RecordMetadata,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "records", audio.as_str(), "metadata"]);
            let resp = send(self.request(Method::PATCH, &url).json(patch), &url).await?;
            ensure_success(resp).await?;
            Ok(())
        })
    }

    fn fetch_artifact<'a>(
        &'a self,
        audio: &'a AudioId,
        kind: ArtifactKind,
    ) -> BackendFuture<'a, ArtifactStatus> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "records", audio.as_str(), kind.path_segment()]);
            let resp = send(self.request(Method::GET, &url), &url).await?;
            if resp.status() == StatusCode::ACCEPTED {
                return Ok(ArtifactStatus::Pending);
            }
            let body = read_body(ensure_success(resp).await?).await?;
            Ok(ArtifactStatus::Ready(artifact_text(body)))
        })
    }

    fn create_guide_upload_url<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, GuideUploadTicket> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "create_questionnaire_upload_url"]);
            let body = serde_json::json!({ "name": name });
            let resp = send(self.request(Method::POST, &url).json(&body), &url).await?;
            read_json(ensure_success(resp).await?).await
        })
    }

    fn list_guides(&self) -> BackendFuture<'_, Vec<GuideSummary>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "questionnaires"]);
            let resp = send(self.request(Method::GET, &url), &url).await?;
            let value: Value = read_json_or_default(ensure_success(resp).await?).await?;
            let wires: Vec<GuideSummaryWire> = decode_listing(value, "questionnaires")?;
            Ok(wires.into_iter().map(GuideSummary::from).collect())
        })
    }

    fn fetch_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "questionnaires", guide.as_str()]);
            let resp = send(self.request(Method::GET, &url), &url).await?;
            read_body(ensure_success(resp).await?).await
        })
    }

    fn delete_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "questionnaires", guide.as_str()]);
            let resp = send(self.request(Method::DELETE, &url), &url).await?;
            delete_outcome(resp, &url).await
        })
    }

    fn list_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        latest_only: bool,
    ) -> BackendFuture<'a, Vec<AnalysisVersion>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "analysis"]);
            let latest = if latest_only { "true" } else { "false" };
            let request = self.request(Method::GET, &url).query(&[
                ("audioId", audio.as_str()),
                ("questionnaireId", guide.as_str()),
                ("latestOnly", latest),
            ]);
            let resp = send(request, &url).await?;
            let value: Value = read_json_or_default(ensure_success(resp).await?).await?;
            decode_listing(value, "versions")
        })
    }

    fn fetch_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        selector: VersionSelector,
    ) -> BackendFuture<'a, AnalysisPayload> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "analysis", audio.as_str(), guide.as_str()]);
            let request = self
                .request(Method::GET, &url)
                .query(&[version_query(selector)]);
            let resp = send(request, &url).await?;
            read_json(ensure_success(resp).await?).await
        })
    }

    fn trigger_analysis<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
    ) -> BackendFuture<'a, AnalysisPayload> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "analyze", audio.as_str(), guide.as_str()]);
            let resp = send(self.request(Method::POST, &url), &url).await?;
            read_json_or_default(ensure_success(resp).await?).await
        })
    }

    fn save_manual_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        request: &'a ManualVersionRequest,
    ) -> BackendFuture<'a, Option<VersionNumber>> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "analysis", audio.as_str(), guide.as_str(), "manual"]);
            let resp = send(self.request(Method::POST, &url).json(request), &url).await?;
            let value: Value = read_json_or_default(ensure_success(resp).await?).await?;
            Ok(value
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .map(VersionNumber::new))
        })
    }

    fn delete_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        scope: DeleteScope,
    ) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let url = self.endpoint(&["api", "analysis", audio.as_str(), guide.as_str()]);
            let query = match scope {
                DeleteScope::Version(v) => ("version", v.value().to_string()),
                DeleteScope::AllVersions => ("allVersions", "true".to_owned()),
            };
            let resp = send(self.request(Method::DELETE, &url).query(&[query]), &url).await?;
            delete_outcome(resp, &url).await
        })
    }
}
