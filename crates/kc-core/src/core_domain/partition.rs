use crate::core::{is_valid_question_text, AnalysisPromptEntry};

/// Minimum shorter/longer length ratio for two texts to count as near-duplicates.
pub const NEAR_DUPLICATE_RATIO: f64 = 0.8;

// ---------------------------------------------------------------------------
// IndexedQuestion — a scorable question and its position in the raw guide
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedQuestion {
    /// Position in the unfiltered guide question list.
    pub original_index: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// filter_questions — separates scorable questions from prompts and noise
// ---------------------------------------------------------------------------

/// Returns the guide questions that are neither structural noise nor prompts.
///
/// A line is dropped when it fails [`is_valid_question_text`], when its
/// normalized text equals a prompt's, or when it is a near-duplicate of a
/// prompt (length ratio at least [`NEAR_DUPLICATE_RATIO`] and one contains the
/// other). Prompt texts come from both the analysis result and the guide.
/// Every line matching a prompt is dropped; there is no keep-first rule.
pub fn filter_questions(
    guide_questions: &[String],
    analysis_prompts: &[AnalysisPromptEntry],
    guide_prompts: &[String],
) -> Vec<IndexedQuestion> {
    let prompt_texts: Vec<String> = analysis_prompts
        .iter()
        .map(|p| normalize(&p.prompt_text))
        .chain(guide_prompts.iter().map(|p| normalize(p)))
        .filter(|p| !p.is_empty())
        .collect();

    guide_questions
        .iter()
        .enumerate()
        .filter(|(_, text)| is_valid_question_text(text))
        .filter(|(_, text)| {
            let normalized = normalize(text);
            !prompt_texts
                .iter()
                .any(|prompt| *prompt == normalized || is_near_duplicate(&normalized, prompt))
        })
        .map(|(original_index, text)| IndexedQuestion {
            original_index,
            text: text.trim().to_owned(),
        })
        .collect()
}

/// Trim + lowercase.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Both inputs are expected to be normalized already.
pub fn is_near_duplicate(a: &str, b: &str) -> bool {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return false;
    }
    let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
    ratio >= NEAR_DUPLICATE_RATIO && (a.contains(b) || b.contains(a))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
