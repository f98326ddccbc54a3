use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use kc_core::core::{
    parse_guide_content, AudioId, AudioRecord, ConsoleBackend, ConsoleError, Guide, GuideId,
    GuideSummary, Interview, RecordMetadata,
};

// ---------------------------------------------------------------------------
// GuideRepository — cached guide listing and parsed guide bodies
// ---------------------------------------------------------------------------

/// Caches are filled lazily and only dropped by [`invalidate`](Self::invalidate)
/// or replaced by [`refresh`](Self::refresh).
pub struct GuideRepository {
    backend: Arc<dyn ConsoleBackend>,
    summaries: RwLock<Option<Vec<GuideSummary>>>,
    guides: RwLock<HashMap<GuideId, Guide>>,
}

impl GuideRepository {
    pub fn new(backend: Arc<dyn ConsoleBackend>) -> Self {
        Self {
            backend,
            summaries: RwLock::new(None),
            guides: RwLock::new(HashMap::new()),
        }
    }

    pub async fn list(&self) -> Result<Vec<GuideSummary>, ConsoleError> {
        if let Some(cached) = self.summaries.read().await.as_ref() {
            return Ok(cached.clone());
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Vec<GuideSummary>, ConsoleError> {
        let summaries = self.backend.list_guides().await?;
        tracing::info!(count = summaries.len(), "guide list refreshed");
        *self.summaries.write().await = Some(summaries.clone());
        self.guides.write().await.clear();
        Ok(summaries)
    }

    pub async fn invalidate(&self) {
        *self.summaries.write().await = None;
        self.guides.write().await.clear();
    }

    /// Fetches and parses one guide body. The display name comes from the
    /// listing when the guide appears there, else the id is used.
    pub async fn get(&self, id: &GuideId) -> Result<Guide, ConsoleError> {
        if let Some(guide) = self.guides.read().await.get(id) {
            return Ok(guide.clone());
        }

        let body = self.backend.fetch_guide(id).await?;
        let content = parse_guide_content(&body)?;
        let name = self
            .list()
            .await?
            .into_iter()
            .find(|s| &s.id == id)
            .map(|s| s.display_name().to_owned())
            .unwrap_or_else(|| id.to_string());

        let guide = Guide::from_content(id.clone(), name, content);
        tracing::debug!(
            guide_id = %id,
            questions = guide.questions.len(),
            prompts = guide.prompts.len(),
            "guide loaded"
        );
        self.guides.write().await.insert(id.clone(), guide.clone());
        Ok(guide)
    }
}

// ---------------------------------------------------------------------------
// InterviewRepository — cached record listing
// ---------------------------------------------------------------------------

pub struct InterviewRepository {
    backend: Arc<dyn ConsoleBackend>,
    records: RwLock<Option<Vec<AudioRecord>>>,
}

impl InterviewRepository {
    pub fn new(backend: Arc<dyn ConsoleBackend>) -> Self {
        Self {
            backend,
            records: RwLock::new(None),
        }
    }

    pub async fn records(&self) -> Result<Vec<AudioRecord>, ConsoleError> {
        if let Some(cached) = self.records.read().await.as_ref() {
            return Ok(cached.clone());
        }
        self.refresh().await
    }

    /// Interview shells for every record, without answers.
    pub async fn list(&self) -> Result<Vec<Interview>, ConsoleError> {
        Ok(self.records().await?.iter().map(Interview::from_record).collect())
    }

    pub async fn refresh(&self) -> Result<Vec<AudioRecord>, ConsoleError> {
        let records = self.backend.list_records().await?;
        tracing::info!(count = records.len(), "record list refreshed");
        *self.records.write().await = Some(records.clone());
        Ok(records)
    }

    pub async fn invalidate(&self) {
        *self.records.write().await = None;
    }

    pub async fn get(&self, audio: &AudioId) -> Result<Option<AudioRecord>, ConsoleError> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .find(|r| &r.audio_id == audio))
    }

    /// Merges `patch` into the cached record, if the listing is cached.
    pub async fn replace_metadata(&self, audio: &AudioId, patch: RecordMetadata) {
        if let Some(records) = self.records.write().await.as_mut() {
            if let Some(record) = records.iter_mut().find(|r| &r.audio_id == audio) {
                record.metadata.merge(patch);
            }
        }
    }

    pub async fn remove(&self, audio: &AudioId) {
        if let Some(records) = self.records.write().await.as_mut() {
            records.retain(|r| &r.audio_id != audio);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, FakeState};
    use kc_core::core::{ConsoleError, GuideError, InterviewStatus};

    fn summary(id: &str, name: &str) -> GuideSummary {
        GuideSummary {
            id: GuideId::new(id),
            name: Some(name.to_owned()),
            size: None,
            last_modified: None,
        }
    }

    fn record(id: &str, farmer: &str) -> AudioRecord {
        AudioRecord {
            audio_id: AudioId::new(id),
            file_name: Some(format!("{id}.m4a")),
            blob_name: None,
            size: None,
            last_modified: None,
            metadata: RecordMetadata {
                farmer_name: Some(farmer.to_owned()),
                ..RecordMetadata::default()
            },
        }
    }

    fn guide_backend() -> Arc<FakeBackend> {
        let mut state = FakeState::default();
        state.guides = vec![summary("g-1", "Rice survey")];
        state.guide_bodies.insert(
            GuideId::new("g-1"),
            r#"{"questions": ["Q1", "Q2"], "prompts": ["Tell us about your farm"]}"#.to_owned(),
        );
        state
            .guide_bodies
            .insert(GuideId::new("g-empty"), "   ".to_owned());
        Arc::new(FakeBackend::with_state(state))
    }

    #[tokio::test]
    async fn test_guide_list_is_cached() {
        let backend = guide_backend();
        let repo = GuideRepository::new(backend.clone());

        repo.list().await.expect("first list");
        repo.list().await.expect("second list");
        assert_eq!(backend.state.lock().expect("lock").guide_list_calls, 1);

        repo.invalidate().await;
        repo.list().await.expect("after invalidate");
        assert_eq!(backend.state.lock().expect("lock").guide_list_calls, 2);
    }

    #[tokio::test]
    async fn test_refresh_always_hits_backend() {
        let backend = guide_backend();
        let repo = GuideRepository::new(backend.clone());

        repo.refresh().await.expect("refresh");
        repo.refresh().await.expect("refresh");
        assert_eq!(backend.state.lock().expect("lock").guide_list_calls, 2);
    }

    #[tokio::test]
    async fn test_get_parses_body_and_names_guide() {
        let repo = GuideRepository::new(guide_backend());

        let guide = repo.get(&GuideId::new("g-1")).await.expect("guide");
        assert_eq!(guide.name, "Rice survey");
        assert_eq!(guide.questions, vec!["Q1", "Q2"]);
        assert_eq!(guide.prompts, vec!["Tell us about your farm"]);
    }

    #[tokio::test]
    async fn test_get_empty_body_is_guide_error() {
        let repo = GuideRepository::new(guide_backend());

        let err = repo.get(&GuideId::new("g-empty")).await.expect_err("empty");
        assert!(matches!(err, ConsoleError::Guide(GuideError::Empty)));
    }

    #[tokio::test]
    async fn test_interview_list_builds_shells() {
        let mut state = FakeState::default();
        state.records = vec![record("aud-1", "Ramesh"), record("aud-2", "Sita")];
        let repo = InterviewRepository::new(Arc::new(FakeBackend::with_state(state)));

        let interviews = repo.list().await.expect("list");
        assert_eq!(interviews.len(), 2);
        assert_eq!(interviews[1].farmer_name, "Sita");
        assert_eq!(interviews[0].status, InterviewStatus::Draft);
        assert!(interviews[0].answers.is_empty());
    }

    #[tokio::test]
    async fn test_replace_metadata_updates_cache_only() {
        let mut state = FakeState::default();
        state.records = vec![record("aud-1", "Ramesh")];
        let backend = Arc::new(FakeBackend::with_state(state));
        let repo = InterviewRepository::new(backend.clone());
        let audio = AudioId::new("aud-1");

        repo.records().await.expect("prime cache");
        repo.replace_metadata(
            &audio,
            RecordMetadata {
                village: Some("Khandala".to_owned()),
                ..RecordMetadata::default()
            },
        )
        .await;

        let cached = repo.get(&audio).await.expect("get").expect("present");
        assert_eq!(cached.metadata.village.as_deref(), Some("Khandala"));
        assert_eq!(cached.metadata.farmer_name.as_deref(), Some("Ramesh"));
        assert_eq!(backend.state.lock().expect("lock").record_list_calls, 1);
    }

    #[tokio::test]
    async fn test_remove_drops_cached_record() {
        let mut state = FakeState::default();
        state.records = vec![record("aud-1", "Ramesh"), record("aud-2", "Sita")];
        let repo = InterviewRepository::new(Arc::new(FakeBackend::with_state(state)));

        repo.records().await.expect("prime cache");
        repo.remove(&AudioId::new("aud-1")).await;
        assert!(repo.get(&AudioId::new("aud-1")).await.expect("get").is_none());
    }
}
