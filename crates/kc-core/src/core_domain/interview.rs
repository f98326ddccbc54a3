use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{
    AnswerBlock, AudioId, AudioRecord, GuideId, InterviewId, InterviewStatus, PromptBlock,
    Reconciliation,
};

// ---------------------------------------------------------------------------
// Interview — a recording, its field metadata and reconciled answers
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: InterviewId,
    pub guide_id: Option<GuideId>,
    pub guide_name: String,
    pub interviewer: String,
    pub date: Option<NaiveDate>,
    pub village: String,
    pub farmer_name: String,
    pub audio_file: String,
    pub status: InterviewStatus,
    pub answers: Vec<AnswerBlock>,
    pub prompts: Vec<PromptBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hindi_transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub english_transcript: Option<String>,
    pub audio_id: AudioId,
}

impl Interview {
    /// Builds an interview shell from a listed record. Answers stay empty
    /// until an analysis version is reconciled into it.
    pub fn from_record(record: &AudioRecord) -> Self {
        let meta = &record.metadata;
        Self {
            id: InterviewId::new(record.audio_id.as_str()),
            guide_id: meta.guide_id.clone(),
            guide_name: meta.guide_name.clone().unwrap_or_default(),
            interviewer: meta.interviewer.clone().unwrap_or_default(),
            date: meta.date,
            village: meta.village.clone().unwrap_or_default(),
            farmer_name: meta.farmer_name.clone().unwrap_or_default(),
            audio_file: record
                .file_name
                .clone()
                .or_else(|| record.blob_name.clone())
                .unwrap_or_default(),
            status: meta.status.clone().unwrap_or_default(),
            answers: Vec::new(),
            prompts: Vec::new(),
            hindi_transcript: None,
            english_transcript: None,
            audio_id: record.audio_id.clone(),
        }
    }

    pub fn apply(&mut self, reconciliation: Reconciliation, status: InterviewStatus) {
        self.answers = reconciliation.answers;
        self.prompts = reconciliation.prompts;
        self.status = status;
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
