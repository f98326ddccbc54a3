use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{clean_guide_line, is_valid_question_text, GuideError, GuideId};

// ---------------------------------------------------------------------------
// Guide — named ordered set of questions and prompts
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub id: GuideId,
    pub name: String,
    pub questions: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire_id: Option<GuideId>,
}

impl Guide {
    pub fn from_content(id: GuideId, name: impl Into<String>, content: GuideContent) -> Self {
        Self {
            id,
            name: name.into(),
            questions: content.questions,
            prompts: content.prompts,
            questionnaire_id: content.questionnaire_id,
        }
    }

    /// Identifier used for analysis calls: the body's `questionnaireId` when the
    /// guide was stored under a different blob name, else the guide id.
    pub fn analysis_id(&self) -> &GuideId {
        self.questionnaire_id.as_ref().unwrap_or(&self.id)
    }
}

/// Listing entry returned by the backend before the guide body is fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideSummary {
    #[serde(alias = "questionnaireId")]
    pub id: GuideId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl GuideSummary {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

// ---------------------------------------------------------------------------
// GuideContent — parsed guide file body
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideContent {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire_id: Option<GuideId>,
}

impl GuideContent {
    /// Canonical JSON body uploaded to the guide SAS URL.
    pub fn to_upload_json(&self) -> Result<String, GuideError> {
        serde_json::to_string_pretty(self).map_err(|e| GuideError::MalformedJson(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.prompts.is_empty()
    }

    pub fn has_usable_lines(&self) -> bool {
        self.questions
            .iter()
            .chain(&self.prompts)
            .any(|l| is_valid_question_text(l))
    }

    /// Drops entries rejected by [`is_valid_question_text`]. Applied before
    /// upload so the stored guide carries no noise entries.
    pub fn without_noise(self) -> Self {
        let keep = |lines: Vec<String>| -> Vec<String> {
            lines
                .into_iter()
                .filter(|l| is_valid_question_text(l))
                .collect()
        };
        Self {
            questions: keep(self.questions),
            prompts: keep(self.prompts),
            questionnaire_id: self.questionnaire_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuideFileWire {
    #[serde(default)]
    questions: Option<Vec<String>>,
    #[serde(default)]
    prompts: Option<Vec<String>>,
    #[serde(default)]
    questionnaire_id: Option<GuideId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Questions,
    Prompts,
}

/// Parses a guide file.
///
/// JSON `{questions?, prompts?}` is tried first; every array entry is kept in
/// place, noise included, so entry positions match the backend's `index`
/// numbering. Anything else, including JSON that fails to parse, is read line
/// by line: blank lines and bare container syntax (`{`, `],` ...) are not
/// entries, numbering such as `1.` or `2)` is dropped and stray punctuation is
/// stripped. A `"prompts":` line switches the remaining lines into the prompt
/// list. Noise that survives is left for [`filter_questions`] to reject.
///
/// [`filter_questions`]: crate::core::filter_questions
pub fn parse_guide_content(text: &str) -> Result<GuideContent, GuideError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GuideError::Empty);
    }

    if trimmed.starts_with('{') {
        if let Ok(wire) = serde_json::from_str::<GuideFileWire>(trimmed) {
            let content = GuideContent {
                questions: clean_lines(wire.questions.unwrap_or_default()),
                prompts: clean_lines(wire.prompts.unwrap_or_default()),
                questionnaire_id: wire.questionnaire_id,
            };
            return non_empty(content);
        }
    }

    let mut content = GuideContent::default();
    let mut section = Section::Questions;
    for raw in trimmed.lines() {
        let line = raw.trim();
        if line.starts_with("\"prompts\":") {
            section = Section::Prompts;
            continue;
        }
        if line.starts_with("\"questions\":") {
            section = Section::Questions;
            continue;
        }

        if line.is_empty() || is_container_syntax(line) {
            continue;
        }

        let cleaned = clean_guide_line(strip_numbering(line));
        match section {
            Section::Questions => content.questions.push(cleaned),
            Section::Prompts => content.prompts.push(cleaned),
        }
    }

    non_empty(content)
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines.iter().map(|l| clean_guide_line(l)).collect()
}

/// Brackets, braces and commas only.
fn is_container_syntax(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '{' | '}' | '[' | ']' | ',') || c.is_whitespace())
}

fn non_empty(content: GuideContent) -> Result<GuideContent, GuideError> {
    if !content.has_usable_lines() {
        Err(GuideError::NoUsableLines)
    } else {
        Ok(content)
    }
}

/// Drops a leading `12.` or `12)` list marker.
fn strip_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return line;
    }
    let rest = &line[digits..];
    match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
        Some(after) => after.trim_start(),
        None => line,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
