use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::core::{
    AnalysisPayload, AnalysisResult, AnalysisVersion, ArtifactKind, ArtifactStatus, AudioId,
    AudioRecord, DeleteOutcome, GuideId, GuideSummary, GuideUploadTicket, ModelName,
    RecordMetadata, TransportError, UploadTicket, VersionNumber, VersionSelector,
};

/// Boxed future returned by every backend call (keeps the port object-safe).
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Request shapes owned by the domain
// ---------------------------------------------------------------------------

/// Body of a human-edit save.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualVersionRequest {
    pub model: ModelName,
    pub result: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub based_on_version: Option<VersionNumber>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteScope {
    Version(VersionNumber),
    AllVersions,
}

// ---------------------------------------------------------------------------
// ConsoleBackend — the remote transcription/analysis service
// ---------------------------------------------------------------------------

pub trait ConsoleBackend: Send + Sync {
    // -- recordings --

    fn create_upload_url<'a>(
        &'a self,
        file_name: &'a str,
        content_type: &'a str,
    ) -> BackendFuture<'a, UploadTicket>;

    /// Direct PUT of raw bytes to a pre-signed blob URL.
    fn upload_blob<'a>(
        &'a self,
        upload_url: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BackendFuture<'a, ()>;

    fn list_records(&self) -> BackendFuture<'_, Vec<AudioRecord>>;

    fn delete_record<'a>(&'a self, audio: &'a AudioId) -> BackendFuture<'a, DeleteOutcome>;

    fn update_metadata<'a>(
        &'a self,
        audio: &'a AudioId,
        patch: &'a RecordMetadata,
    ) -> BackendFuture<'a, ()>;

    fn fetch_artifact<'a>(
        &'a self,
        audio: &'a AudioId,
        kind: ArtifactKind,
    ) -> BackendFuture<'a, ArtifactStatus>;

    // -- guides --

    fn create_guide_upload_url<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, GuideUploadTicket>;

    fn list_guides(&self) -> BackendFuture<'_, Vec<GuideSummary>>;

    /// Raw guide body: JSON `{questions, prompts}` or legacy plain text.
    fn fetch_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, String>;

    fn delete_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, DeleteOutcome>;

    // -- analysis --

    fn list_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        latest_only: bool,
    ) -> BackendFuture<'a, Vec<AnalysisVersion>>;

    fn fetch_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        selector: VersionSelector,
    ) -> BackendFuture<'a, AnalysisPayload>;

    fn trigger_analysis<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
    ) -> BackendFuture<'a, AnalysisPayload>;

    fn save_manual_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        request: &'a ManualVersionRequest,
    ) -> BackendFuture<'a, Option<VersionNumber>>;

    fn delete_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        scope: DeleteScope,
    ) -> BackendFuture<'a, DeleteOutcome>;
}
