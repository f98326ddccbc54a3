use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{AudioId, GuideId, InterviewStatus};

// ---------------------------------------------------------------------------
// RecordMetadata — merge-update fields attached to an uploaded recording
// ---------------------------------------------------------------------------

/// Every field is optional: a metadata update only sends what is set, and the
/// backend merges it into the stored record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_id: Option<GuideId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InterviewStatus>,
}

impl RecordMetadata {
    /// Fields set in `patch` overwrite those in `self`.
    pub fn merge(&mut self, patch: RecordMetadata) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })*
            };
        }
        take!(interviewer, date, village, farmer_name, guide_id, guide_name, status);
    }
}

// ---------------------------------------------------------------------------
// AudioRecord — one uploaded recording as listed by the backend
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRecord {
    pub audio_id: AudioId,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub blob_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: RecordMetadata,
}

// ---------------------------------------------------------------------------
// Upload tickets — pre-signed blob URLs handed out by the backend
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    #[serde(alias = "sasUrl")]
    pub upload_url: String,
    pub audio_id: AudioId,
    #[serde(default)]
    pub blob_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideUploadTicket {
    #[serde(alias = "sasUrl")]
    pub upload_url: String,
    #[serde(alias = "id")]
    pub questionnaire_id: GuideId,
}

// ---------------------------------------------------------------------------
// Asynchronous artifacts (transcript, translation)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Transcript,
    Translation,
}

impl ArtifactKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Translation => "translation",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Not-yet-ready is a state, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactStatus {
    Pending,
    Ready(String),
}

impl ArtifactStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ArtifactStatus::Ready(_))
    }
}

/// Result of a delete call; 404 counts as already gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
