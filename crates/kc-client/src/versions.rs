use std::sync::Arc;

use futures_util::stream::{self, StreamExt};

use kc_core::core::{
    select_version, sort_versions_desc, AnalysisPayload, AnalysisVersion, AudioId, ConsoleBackend,
    ConsoleError, GuideId, ModelName, VersionError, VersionSelector,
};

/// A selected version together with its stored body.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedVersion {
    pub version: AnalysisVersion,
    pub payload: AnalysisPayload,
}

impl ResolvedVersion {
    /// Model recorded on the payload, falling back to the listing entry.
    pub fn model(&self) -> Option<&ModelName> {
        self.payload.model.as_ref().or(self.version.model.as_ref())
    }
}

// ---------------------------------------------------------------------------
// VersionService — listing and resolution of analysis versions
// ---------------------------------------------------------------------------

pub struct VersionService {
    backend: Arc<dyn ConsoleBackend>,
    concurrency: usize,
}

impl VersionService {
    pub fn new(backend: Arc<dyn ConsoleBackend>, concurrency: usize) -> Self {
        Self {
            backend,
            concurrency: concurrency.max(1),
        }
    }

    /// All versions for the pair, newest first.
    pub async fn list(
        &self,
        audio: &AudioId,
        guide: &GuideId,
    ) -> Result<Vec<AnalysisVersion>, ConsoleError> {
        let mut versions = self.backend.list_versions(audio, guide, false).await?;
        sort_versions_desc(&mut versions);
        Ok(versions)
    }

    /// Resolves `selector` against the full listing and fetches that body.
    ///
    /// A listing failure is reported as "no versions" for the pair; the
    /// underlying cause is only logged.
    pub async fn resolve(
        &self,
        audio: &AudioId,
        guide: &GuideId,
        selector: VersionSelector,
    ) -> Result<ResolvedVersion, ConsoleError> {
        let versions = match self.backend.list_versions(audio, guide, false).await {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(audio_id = %audio, guide_id = %guide, error = %e, "version listing failed");
                return Err(VersionError::NoVersions {
                    audio: audio.clone(),
                    guide: guide.clone(),
                }
                .into());
            }
        };

        let version = select_version(&versions, selector, audio, guide)?;
        tracing::debug!(audio_id = %audio, guide_id = %guide, version = %version.version, "version selected");

        let payload = self
            .backend
            .fetch_version(audio, guide, VersionSelector::Exact(version.version))
            .await?;
        Ok(ResolvedVersion { version, payload })
    }

    /// Like [`list`](Self::list), filling in models the listing omits by
    /// fetching those bodies with bounded concurrency. A body that fails to
    /// load leaves its model empty.
    pub async fn list_with_models(
        &self,
        audio: &AudioId,
        guide: &GuideId,
    ) -> Result<Vec<AnalysisVersion>, ConsoleError> {
        let mut versions = self.list(audio, guide).await?;
        let missing: Vec<_> = versions
            .iter()
            .enumerate()
            .filter(|(_, v)| v.model.is_none())
            .map(|(i, v)| (i, v.version))
            .collect();

        let backend = &self.backend;
        let models: Vec<(usize, Option<ModelName>)> = stream::iter(missing)
            .map(|(i, number)| async move {
                match backend
                    .fetch_version(audio, guide, VersionSelector::Exact(number))
                    .await
                {
                    Ok(payload) => (i, payload.model),
                    Err(e) => {
                        tracing::warn!(version = %number, error = %e, "could not load version body");
                        (i, None)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (i, model) in models {
            if let Some(v) = versions.get_mut(i) {
                v.model = model;
            }
        }
        Ok(versions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
