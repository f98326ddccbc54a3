use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{AudioId, GuideId, ModelName, VersionNumber};

// ---------------------------------------------------------------------------
// Quote — supporting excerpt from the transcript
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub quote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Quotes arrive either as bare strings or as `{quote, note?}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum QuoteWire {
    Text(String),
    Object {
        quote: String,
        #[serde(default)]
        note: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Quote {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match QuoteWire::deserialize(deserializer)? {
            QuoteWire::Text(quote) => Quote { quote, note: None },
            QuoteWire::Object { quote, note } => Quote { quote, note },
        })
    }
}

// ---------------------------------------------------------------------------
// Analysis result entries
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuestionEntry {
    /// Position of the question in the unfiltered guide list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl AnalysisQuestionEntry {
    /// A prompt response that leaked into the question array: it carries a
    /// `response` but neither an answer summary nor question text.
    pub fn looks_like_prompt(&self) -> bool {
        self.response.is_some() && self.answer_summary.is_none() && self.question_text.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPromptEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub questions: Vec<AnalysisQuestionEntry>,
    #[serde(default)]
    pub prompts: Vec<AnalysisPromptEntry>,
}

// ---------------------------------------------------------------------------
// AnalysisPayload — one version's stored body
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_id: Option<AudioId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire_id: Option<GuideId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: AnalysisResult,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
