use serde::{Deserialize, Serialize};

use crate::core::{
    is_valid_question_text, AnalysisPromptEntry, AnalysisQuestionEntry, AnalysisResult,
    IndexedQuestion, Quote,
};

// ---------------------------------------------------------------------------
// Derived display blocks
// ---------------------------------------------------------------------------

/// A guide question paired with its extracted answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnswerBlock {
    /// Position of the question in the unfiltered guide list.
    pub index: usize,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<Quote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl AnswerBlock {
    pub fn is_answered(&self) -> bool {
        !self.answer.trim().is_empty()
    }
}

/// An open-ended outline item paired with its free-text response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptBlock {
    pub index: usize,
    pub prompt_text: String,
    pub response: String,
}

// ---------------------------------------------------------------------------
// align_answers — maps filtered guide questions to result entries
// ---------------------------------------------------------------------------

/// Pairs every filtered question with an analysis entry.
///
/// Lookup order for the question at display position `i`:
/// 1. the entry whose `index` equals the question's original guide index;
/// 2. `result[i]`, if it carries no `index` of its own and does not look like
///    a prompt response;
/// 3. nothing, giving an empty answer.
///
/// Count or index mismatches never fail; unmatched questions stay empty.
pub fn align_answers(
    questions: &[IndexedQuestion],
    result: &[AnalysisQuestionEntry],
) -> Vec<AnswerBlock> {
    questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let entry = result
                .iter()
                .find(|e| e.index == Some(question.original_index))
                .or_else(|| {
                    result
                        .get(position)
                        .filter(|e| e.index.is_none() && !e.looks_like_prompt())
                });

            match entry {
                Some(e) => AnswerBlock {
                    index: question.original_index,
                    question: question.text.clone(),
                    answer: e.answer_summary.clone().unwrap_or_default(),
                    quotes: e.quotes.clone(),
                    reasoning: e.reasoning.clone(),
                },
                None => AnswerBlock {
                    index: question.original_index,
                    question: question.text.clone(),
                    answer: String::new(),
                    quotes: Vec::new(),
                    reasoning: None,
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// align_prompts — maps guide prompts to prompt responses
// ---------------------------------------------------------------------------

/// Pairs guide prompts with analysis responses by index, then position.
/// Noise entries are skipped but still count towards positions.
///
/// When the guide lists no prompts, the analysis prompts are shown as-is.
pub fn align_prompts(
    guide_prompts: &[String],
    analysis_prompts: &[AnalysisPromptEntry],
) -> Vec<PromptBlock> {
    if guide_prompts.is_empty() {
        return analysis_prompts
            .iter()
            .enumerate()
            .map(|(position, p)| PromptBlock {
                index: p.index.unwrap_or(position),
                prompt_text: p.prompt_text.clone(),
                response: p.response.clone(),
            })
            .collect();
    }

    guide_prompts
        .iter()
        .enumerate()
        .filter(|(_, text)| is_valid_question_text(text))
        .map(|(position, text)| {
            let response = analysis_prompts
                .iter()
                .find(|p| p.index == Some(position))
                .or_else(|| analysis_prompts.get(position).filter(|p| p.index.is_none()))
                .map(|p| p.response.clone())
                .unwrap_or_default();
            PromptBlock {
                index: position,
                prompt_text: text.clone(),
                response,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// build_manual_result — edited blocks back into the stored result shape
// ---------------------------------------------------------------------------

/// Rebuilds an [`AnalysisResult`] from edited blocks for a manual version.
/// Original guide indices are kept so later alignment matches by index.
pub fn build_manual_result(answers: &[AnswerBlock], prompts: &[PromptBlock]) -> AnalysisResult {
    AnalysisResult {
        questions: answers
            .iter()
            .map(|a| AnalysisQuestionEntry {
                index: Some(a.index),
                question_text: Some(a.question.clone()),
                answer_summary: Some(a.answer.clone()),
                quotes: a.quotes.clone(),
                reasoning: a.reasoning.clone(),
                response: None,
            })
            .collect(),
        prompts: prompts
            .iter()
            .map(|p| AnalysisPromptEntry {
                index: Some(p.index),
                prompt_text: p.prompt_text.clone(),
                response: p.response.clone(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
