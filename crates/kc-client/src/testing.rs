//! In-memory backend for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use kc_core::core::{
    AnalysisPayload, AnalysisResult, AnalysisVersion, ArtifactKind, ArtifactStatus, AudioId,
    AudioRecord, BackendFuture, ConsoleBackend, DeleteOutcome, DeleteScope, GuideId, GuideSummary,
    GuideUploadTicket, ManualVersionRequest, ModelName, RecordMetadata, TransportError,
    UploadTicket, VersionNumber, VersionSelector,
};

#[derive(Default)]
pub struct FakeState {
    pub records: Vec<AudioRecord>,
    pub guides: Vec<GuideSummary>,
    pub guide_bodies: HashMap<GuideId, String>,
    pub versions: HashMap<(AudioId, GuideId), Vec<(AnalysisVersion, AnalysisPayload)>>,
    pub artifacts: HashMap<(AudioId, &'static str), VecDeque<ArtifactStatus>>,
    pub analysis_result: AnalysisResult,
    pub fail_version_listing: bool,
    pub fail_version_fetch: Vec<VersionNumber>,
    pub uploads: Vec<(String, Vec<u8>)>,
    pub metadata_patches: Vec<(AudioId, RecordMetadata)>,
    pub manual_saves: Vec<ManualVersionRequest>,
    pub guide_list_calls: u32,
    pub record_list_calls: u32,
    /// Holds each version fetch open this long so overlap can be observed.
    pub fetch_delay: Option<Duration>,
    pub fetches_in_flight: usize,
    pub peak_fetches_in_flight: usize,
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

pub fn version_entry(
    audio: &str,
    guide: &str,
    number: u32,
    model: Option<&str>,
    result: AnalysisResult,
) -> (AnalysisVersion, AnalysisPayload) {
    let version = AnalysisVersion {
        audio_id: AudioId::new(audio),
        questionnaire_id: GuideId::new(guide),
        version: VersionNumber::new(number),
        blob_name: format!("{audio}/{guide}/v{number}.json"),
        size: 0,
        last_modified: None,
        model: None,
    };
    let payload = AnalysisPayload {
        audio_id: Some(AudioId::new(audio)),
        questionnaire_id: Some(GuideId::new(guide)),
        version: Some(VersionNumber::new(number)),
        model: model.map(ModelName::new),
        created_at: None,
        result,
    };
    (version, payload)
}

impl FakeBackend {
    pub fn with_state(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(what: &str) -> TransportError {
        TransportError::HttpStatus {
            status: 404,
            body: format!("{what} not found"),
        }
    }
}

impl ConsoleBackend for FakeBackend {
    fn create_upload_url<'a>(
        &'a self,
        file_name: &'a str,
        _content_type: &'a str,
    ) -> BackendFuture<'a, UploadTicket> {
        Box::pin(async move {
            let audio = format!("aud-{}", file_name.trim_end_matches(".m4a"));
            Ok(UploadTicket {
                upload_url: format!("http://blob.local/audio/{audio}?sig=x"),
                audio_id: AudioId::new(audio),
                blob_name: Some(file_name.to_owned()),
            })
        })
    }

    fn upload_blob<'a>(
        &'a self,
        upload_url: &'a str,
        bytes: Vec<u8>,
        _content_type: &'a str,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.lock().uploads.push((upload_url.to_owned(), bytes));
            Ok(())
        })
    }

    fn list_records(&self) -> BackendFuture<'_, Vec<AudioRecord>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record_list_calls += 1;
            Ok(state.records.clone())
        })
    }

    fn delete_record<'a>(&'a self, audio: &'a AudioId) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let mut state = self.lock();
            let before = state.records.len();
            state.records.retain(|r| &r.audio_id != audio);
            Ok(if state.records.len() < before {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyAbsent
            })
        })
    }

    fn update_metadata<'a>(
        &'a self,
        audio: &'a AudioId,
        patch: &'a RecordMetadata,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.lock();
            state.metadata_patches.push((audio.clone(), patch.clone()));
            if let Some(record) = state.records.iter_mut().find(|r| &r.audio_id == audio) {
                record.metadata.merge(patch.clone());
            }
            Ok(())
        })
    }

    fn fetch_artifact<'a>(
        &'a self,
        audio: &'a AudioId,
        kind: ArtifactKind,
    ) -> BackendFuture<'a, ArtifactStatus> {
        Box::pin(async move {
            let mut state = self.lock();
            let queue = state
                .artifacts
                .get_mut(&(audio.clone(), kind.path_segment()))
                .ok_or_else(|| Self::not_found("artifact"))?;
            let status = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            Ok(status.unwrap_or(ArtifactStatus::Pending))
        })
    }

    fn create_guide_upload_url<'a>(
        &'a self,
        name: &'a str,
    ) -> BackendFuture<'a, GuideUploadTicket> {
        Box::pin(async move {
            Ok(GuideUploadTicket {
                upload_url: format!("http://blob.local/guides/{name}?sig=x"),
                questionnaire_id: GuideId::new(name),
            })
        })
    }

    fn list_guides(&self) -> BackendFuture<'_, Vec<GuideSummary>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.guide_list_calls += 1;
            Ok(state.guides.clone())
        })
    }

    fn fetch_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, String> {
        Box::pin(async move {
            self.lock()
                .guide_bodies
                .get(guide)
                .cloned()
                .ok_or_else(|| Self::not_found("guide"))
        })
    }

    fn delete_guide<'a>(&'a self, guide: &'a GuideId) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let mut state = self.lock();
            let removed = state.guide_bodies.remove(guide).is_some();
            state.guides.retain(|g| &g.id != guide);
            Ok(if removed {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyAbsent
            })
        })
    }

    fn list_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        _latest_only: bool,
    ) -> BackendFuture<'a, Vec<AnalysisVersion>> {
        Box::pin(async move {
            let state = self.lock();
            if state.fail_version_listing {
                return Err(TransportError::Connection {
                    url: "http://fake".to_owned(),
                    message: "refused".to_owned(),
                });
            }
            Ok(state
                .versions
                .get(&(audio.clone(), guide.clone()))
                .map(|vs| vs.iter().map(|(v, _)| v.clone()).collect())
                .unwrap_or_default())
        })
    }

    fn fetch_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        selector: VersionSelector,
    ) -> BackendFuture<'a, AnalysisPayload> {
        Box::pin(async move {
            let delay = {
                let mut state = self.lock();
                state.fetches_in_flight += 1;
                state.peak_fetches_in_flight =
                    state.peak_fetches_in_flight.max(state.fetches_in_flight);
                state.fetch_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.lock();
            state.fetches_in_flight -= 1;
            let entries = state
                .versions
                .get(&(audio.clone(), guide.clone()))
                .ok_or_else(|| Self::not_found("analysis"))?;
            let found = match selector {
                VersionSelector::Exact(n) => {
                    if state.fail_version_fetch.contains(&n) {
                        return Err(TransportError::HttpStatus {
                            status: 500,
                            body: "storage error".to_owned(),
                        });
                    }
                    entries.iter().find(|(v, _)| v.version == n)
                }
                VersionSelector::Latest => entries.iter().max_by_key(|(v, _)| v.version),
            };
            found
                .map(|(_, p)| p.clone())
                .ok_or_else(|| Self::not_found("version"))
        })
    }

    fn trigger_analysis<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
    ) -> BackendFuture<'a, AnalysisPayload> {
        Box::pin(async move {
            let mut state = self.lock();
            let result = state.analysis_result.clone();
            let entries = state
                .versions
                .entry((audio.clone(), guide.clone()))
                .or_default();
            let next = entries.iter().map(|(v, _)| v.version.value()).max().unwrap_or(0) + 1;
            let entry = version_entry(audio.as_str(), guide.as_str(), next, Some("gpt-5.1"), result);
            entries.push(entry.clone());
            Ok(entry.1)
        })
    }

    fn save_manual_version<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        request: &'a ManualVersionRequest,
    ) -> BackendFuture<'a, Option<VersionNumber>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.manual_saves.push(request.clone());
            let entries = state
                .versions
                .entry((audio.clone(), guide.clone()))
                .or_default();
            let next = entries.iter().map(|(v, _)| v.version.value()).max().unwrap_or(0) + 1;
            entries.push(version_entry(
                audio.as_str(),
                guide.as_str(),
                next,
                Some(request.model.as_str()),
                request.result.clone(),
            ));
            Ok(Some(VersionNumber::new(next)))
        })
    }

    fn delete_versions<'a>(
        &'a self,
        audio: &'a AudioId,
        guide: &'a GuideId,
        scope: DeleteScope,
    ) -> BackendFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            let mut state = self.lock();
            let Some(entries) = state.versions.get_mut(&(audio.clone(), guide.clone())) else {
                return Ok(DeleteOutcome::AlreadyAbsent);
            };
            let before = entries.len();
            match scope {
                DeleteScope::Version(n) => entries.retain(|(v, _)| v.version != n),
                DeleteScope::AllVersions => entries.clear(),
            }
            Ok(if entries.len() < before {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyAbsent
            })
        })
    }
}
