use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use kc_core::core::{
    build_manual_result, empty_answers, parse_guide_content, reconcile, AnalysisVersion,
    AnswerBlock, ArtifactKind, ArtifactStatus, AudioId, ConsoleBackend, ConsoleError,
    DeleteOutcome, DeleteScope, Guide, GuideId, Interview, InterviewStatus,
    ManualVersionRequest, ModelName, PromptBlock, Reconciliation, RecordMetadata, VersionError,
    VersionNumber, VersionSelector,
};

use crate::backend::HttpBackend;
use crate::bootstrap::RuntimeConfig;
use crate::polling::{poll_artifact, PollConfig};
use crate::repository::{GuideRepository, InterviewRepository};
use crate::versions::VersionService;

const GUIDE_CONTENT_TYPE: &str = "application/json";

/// Audio file plus the field metadata recorded alongside it.
#[derive(Clone, Debug)]
pub struct InterviewUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub metadata: RecordMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedInterview {
    pub audio_id: AudioId,
    pub transcript: String,
    pub translation: String,
}

/// Answers reconciled against one stored analysis version.
#[derive(Clone, Debug)]
pub struct LoadedAnswers {
    pub guide: Guide,
    pub version: AnalysisVersion,
    pub model: Option<ModelName>,
    pub reconciliation: Reconciliation,
}

/// Outcome of a freshly triggered analysis.
#[derive(Clone, Debug)]
pub struct AnalysisRun {
    pub version: Option<VersionNumber>,
    pub status: InterviewStatus,
    pub reconciliation: Reconciliation,
}

/// A human-approved set of answers for one (audio, guide) pair.
#[derive(Clone, Debug)]
pub struct HumanEdit {
    pub answers: Vec<AnswerBlock>,
    pub prompts: Vec<PromptBlock>,
    /// Model of the version the edit started from.
    pub base_model: ModelName,
    pub based_on_version: Option<VersionNumber>,
}

// ---------------------------------------------------------------------------
// ConsoleService — multi-step console operations over the backend
// ---------------------------------------------------------------------------

pub struct ConsoleService {
    backend: Arc<dyn ConsoleBackend>,
    pub guides: GuideRepository,
    pub interviews: InterviewRepository,
    pub versions: VersionService,
    poll: PollConfig,
    default_model: ModelName,
}

impl ConsoleService {
    pub fn new(
        backend: Arc<dyn ConsoleBackend>,
        poll: PollConfig,
        model_fetch_concurrency: usize,
        default_model: ModelName,
    ) -> Self {
        Self {
            guides: GuideRepository::new(backend.clone()),
            interviews: InterviewRepository::new(backend.clone()),
            versions: VersionService::new(backend.clone(), model_fetch_concurrency),
            backend,
            poll,
            default_model,
        }
    }

    /// Builds the service over the HTTP backend described by `runtime`.
    pub fn from_runtime(runtime: &RuntimeConfig) -> Result<Self, ConsoleError> {
        let backend = HttpBackend::new(&runtime.base_url, runtime.request_timeout)?;
        Ok(Self::new(
            Arc::new(backend),
            runtime.poll,
            runtime.model_fetch_concurrency,
            runtime.default_model.clone(),
        ))
    }

    pub fn backend(&self) -> &dyn ConsoleBackend {
        self.backend.as_ref()
    }

    // -- recordings --

    /// Uploads audio, records its metadata as a draft, then waits for the
    /// transcript and the translation in that order.
    pub async fn upload_interview(
        &self,
        upload: InterviewUpload,
        cancel: &CancellationToken,
    ) -> Result<UploadedInterview, ConsoleError> {
        let InterviewUpload {
            file_name,
            content_type,
            bytes,
            mut metadata,
        } = upload;

        let ticket = self
            .backend
            .create_upload_url(&file_name, &content_type)
            .await?;
        let audio = ticket.audio_id;
        tracing::info!(audio_id = %audio, %file_name, size = bytes.len(), "uploading audio");

        self.backend
            .upload_blob(&ticket.upload_url, bytes, &content_type)
            .await?;

        metadata.status.get_or_insert(InterviewStatus::Draft);
        self.backend.update_metadata(&audio, &metadata).await?;
        self.interviews.invalidate().await;

        let transcript = poll_artifact(
            self.backend(),
            &audio,
            ArtifactKind::Transcript,
            &self.poll,
            cancel,
        )
        .await?;
        let translation = poll_artifact(
            self.backend(),
            &audio,
            ArtifactKind::Translation,
            &self.poll,
            cancel,
        )
        .await?;

        Ok(UploadedInterview {
            audio_id: audio,
            transcript,
            translation,
        })
    }

    pub async fn update_metadata(
        &self,
        audio: &AudioId,
        patch: RecordMetadata,
    ) -> Result<(), ConsoleError> {
        self.backend.update_metadata(audio, &patch).await?;
        self.interviews.replace_metadata(audio, patch).await;
        Ok(())
    }

    pub async fn delete_interview(&self, audio: &AudioId) -> Result<DeleteOutcome, ConsoleError> {
        let outcome = self.backend.delete_record(audio).await?;
        self.interviews.remove(audio).await;
        Ok(outcome)
    }

    /// Single fetch of a transcript or translation, without polling.
    pub async fn artifact(
        &self,
        audio: &AudioId,
        kind: ArtifactKind,
    ) -> Result<ArtifactStatus, ConsoleError> {
        Ok(self.backend.fetch_artifact(audio, kind).await?)
    }

    /// Interview with answers reconciled against the latest analysis.
    ///
    /// A recording that was never analysed gets empty answers for its guide.
    /// Transcripts are attached when already available.
    pub async fn load_interview(&self, audio: &AudioId) -> Result<Option<Interview>, ConsoleError> {
        let Some(record) = self.interviews.get(audio).await? else {
            return Ok(None);
        };
        let mut interview = Interview::from_record(&record);

        if let Some(guide_id) = interview.guide_id.clone() {
            match self
                .load_answers(audio, &guide_id, VersionSelector::Latest)
                .await
            {
                Ok(loaded) => {
                    let status = interview.status.clone();
                    interview.apply(loaded.reconciliation, status);
                }
                Err(ConsoleError::Version(VersionError::NoVersions { .. })) => {
                    let guide = self.guides.get(&guide_id).await?;
                    interview.answers = empty_answers(&guide);
                }
                Err(e) => return Err(e),
            }
        }

        interview.hindi_transcript = self.ready_text(audio, ArtifactKind::Transcript).await;
        interview.english_transcript = self.ready_text(audio, ArtifactKind::Translation).await;
        Ok(Some(interview))
    }

    async fn ready_text(&self, audio: &AudioId, kind: ArtifactKind) -> Option<String> {
        match self.backend.fetch_artifact(audio, kind).await {
            Ok(ArtifactStatus::Ready(text)) => Some(text),
            Ok(ArtifactStatus::Pending) => None,
            Err(e) => {
                tracing::debug!(audio_id = %audio, %kind, error = %e, "artifact unavailable");
                None
            }
        }
    }

    // -- guides --

    /// Validates a guide file locally, then uploads its canonical JSON.
    pub async fn upload_guide(&self, name: &str, text: &str) -> Result<GuideId, ConsoleError> {
        let content = parse_guide_content(text)?.without_noise();
        let body = content.to_upload_json()?;

        let ticket = self.backend.create_guide_upload_url(name).await?;
        self.backend
            .upload_blob(&ticket.upload_url, body.into_bytes(), GUIDE_CONTENT_TYPE)
            .await?;
        self.guides.invalidate().await;

        tracing::info!(
            guide_id = %ticket.questionnaire_id,
            questions = content.questions.len(),
            prompts = content.prompts.len(),
            "guide uploaded"
        );
        Ok(ticket.questionnaire_id)
    }

    pub async fn delete_guide(&self, guide: &GuideId) -> Result<DeleteOutcome, ConsoleError> {
        let outcome = self.backend.delete_guide(guide).await?;
        self.guides.invalidate().await;
        Ok(outcome)
    }

    // -- analysis --

    /// Triggers analysis, stamps the record with the generating model, and
    /// reconciles the new result against the guide.
    pub async fn run_analysis(
        &self,
        audio: &AudioId,
        guide_id: &GuideId,
    ) -> Result<AnalysisRun, ConsoleError> {
        let guide = self.guides.get(guide_id).await?;
        tracing::info!(audio_id = %audio, guide_id = %guide_id, "analysis requested");
        let payload = self
            .backend
            .trigger_analysis(audio, guide.analysis_id())
            .await?;

        let model = payload
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let status = InterviewStatus::Generated(model);
        self.update_metadata(
            audio,
            RecordMetadata {
                guide_id: Some(guide.id.clone()),
                guide_name: Some(guide.name.clone()),
                status: Some(status.clone()),
                ..RecordMetadata::default()
            },
        )
        .await?;

        let reconciliation = reconcile(&guide, &payload);
        log_drift(audio, &guide, &reconciliation);
        Ok(AnalysisRun {
            version: payload.version,
            status,
            reconciliation,
        })
    }

    pub async fn load_answers(
        &self,
        audio: &AudioId,
        guide_id: &GuideId,
        selector: VersionSelector,
    ) -> Result<LoadedAnswers, ConsoleError> {
        let guide = self.guides.get(guide_id).await?;
        let resolved = self
            .versions
            .resolve(audio, guide.analysis_id(), selector)
            .await?;

        let reconciliation = reconcile(&guide, &resolved.payload);
        log_drift(audio, &guide, &reconciliation);
        Ok(LoadedAnswers {
            model: resolved.model().cloned(),
            version: resolved.version,
            guide,
            reconciliation,
        })
    }

    /// Persists edited answers as a new manual version, then marks the record
    /// as human-edited.
    ///
    /// The two writes are not atomic: if the metadata update fails the new
    /// version exists but the record still shows its old status. The local
    /// interview cache is dropped either way.
    pub async fn save_human_edit(
        &self,
        audio: &AudioId,
        guide_id: &GuideId,
        edit: HumanEdit,
    ) -> Result<Option<VersionNumber>, ConsoleError> {
        let status = InterviewStatus::HumanEdited(edit.base_model);
        let request = ManualVersionRequest {
            model: ModelName::new(status.to_wire()),
            result: build_manual_result(&edit.answers, &edit.prompts),
            based_on_version: edit.based_on_version,
        };

        let guide = self.guides.get(guide_id).await?;
        let saved = self
            .backend
            .save_manual_version(audio, guide.analysis_id(), &request)
            .await;
        let version = match saved {
            Ok(version) => version,
            Err(e) => {
                self.interviews.invalidate().await;
                return Err(e.into());
            }
        };
        tracing::info!(audio_id = %audio, guide_id = %guide_id, model = %request.model, "human edit saved");

        let patch = RecordMetadata {
            status: Some(status),
            ..RecordMetadata::default()
        };
        let updated = self.backend.update_metadata(audio, &patch).await;
        self.interviews.invalidate().await;
        updated?;
        Ok(version)
    }

    pub async fn delete_analysis(
        &self,
        audio: &AudioId,
        guide_id: &GuideId,
        scope: DeleteScope,
    ) -> Result<DeleteOutcome, ConsoleError> {
        let analysis_id = match self.guides.get(guide_id).await {
            Ok(guide) => guide.analysis_id().clone(),
            Err(e) => {
                tracing::warn!(
                    guide_id = %guide_id,
                    error = %e,
                    "guide unavailable, deleting by guide id"
                );
                guide_id.clone()
            }
        };
        let outcome = self
            .backend
            .delete_versions(audio, &analysis_id, scope)
            .await?;
        if scope == DeleteScope::AllVersions {
            self.update_metadata(
                audio,
                RecordMetadata {
                    status: Some(InterviewStatus::Draft),
                    ..RecordMetadata::default()
                },
            )
            .await?;
        }
        Ok(outcome)
    }
}

fn log_drift(audio: &AudioId, guide: &Guide, reconciliation: &Reconciliation) {
    if reconciliation.drift() {
        tracing::warn!(
            audio_id = %audio,
            guide_id = %guide.id,
            guide_questions = reconciliation.filtered_count,
            result_questions = reconciliation.result_count,
            unmatched = reconciliation.unmatched,
            "guide and analysis disagree on question count"
        );
    }
}
