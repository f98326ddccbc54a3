use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{AudioId, GuideId, ModelName, VersionError, VersionNumber};

// ---------------------------------------------------------------------------
// AnalysisVersion — listing metadata for one stored analysis snapshot
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisVersion {
    pub audio_id: AudioId,
    pub questionnaire_id: GuideId,
    pub version: VersionNumber,
    #[serde(default)]
    pub blob_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub model: Option<ModelName>,
}

// ---------------------------------------------------------------------------
// VersionSelector — latest or an explicit version number
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionSelector {
    #[default]
    Latest,
    Exact(VersionNumber),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::Latest => f.write_str("latest"),
            VersionSelector::Exact(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for VersionSelector {
    type Err = String;

    /// Accepts `latest`, `3`, or `v3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("latest") {
            return Ok(VersionSelector::Latest);
        }
        let digits = s.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(s);
        digits
            .parse::<u32>()
            .map(|n| VersionSelector::Exact(VersionNumber::new(n)))
            .map_err(|_| format!("expected \"latest\" or a version number, got {s:?}"))
    }
}

// ---------------------------------------------------------------------------
// Pure selection over a fetched version list (no IO)
// ---------------------------------------------------------------------------

/// Sorts versions newest first. Backend order is not trusted; duplicate
/// version numbers fall back to the most recent `last_modified`.
pub fn sort_versions_desc(versions: &mut [AnalysisVersion]) {
    versions.sort_by_key(|v| (Reverse(v.version), Reverse(v.last_modified)));
}

/// Picks the version matching `selector` from an unordered list.
pub fn select_version(
    versions: &[AnalysisVersion],
    selector: VersionSelector,
    audio: &AudioId,
    guide: &GuideId,
) -> Result<AnalysisVersion, VersionError> {
    if versions.is_empty() {
        return Err(VersionError::NoVersions {
            audio: audio.clone(),
            guide: guide.clone(),
        });
    }

    let mut sorted = versions.to_vec();
    sort_versions_desc(&mut sorted);

    match selector {
        VersionSelector::Latest => Ok(sorted.swap_remove(0)),
        VersionSelector::Exact(wanted) => sorted
            .into_iter()
            .find(|v| v.version == wanted)
            .ok_or(VersionError::NotFound { version: wanted }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
