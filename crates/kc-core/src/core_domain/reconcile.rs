use crate::core::{
    align_answers, align_prompts, filter_questions, AnalysisPayload, AnswerBlock, Guide,
    PromptBlock,
};

// ---------------------------------------------------------------------------
// Reconciliation — guide questions merged with one analysis version
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation {
    pub answers: Vec<AnswerBlock>,
    pub prompts: Vec<PromptBlock>,
    /// Scorable guide questions after partitioning.
    pub filtered_count: usize,
    /// Question entries present in the analysis result.
    pub result_count: usize,
    /// Questions left with an empty answer.
    pub unmatched: usize,
}

impl Reconciliation {
    /// The guide and the analysis disagree on the question count, which
    /// happens when a guide is edited after it was analysed.
    pub fn drift(&self) -> bool {
        self.result_count != 0 && self.result_count != self.filtered_count
    }
}

/// Partitions the guide against the payload's prompts and aligns answers.
pub fn reconcile(guide: &Guide, payload: &AnalysisPayload) -> Reconciliation {
    let filtered = filter_questions(&guide.questions, &payload.result.prompts, &guide.prompts);
    let answers = align_answers(&filtered, &payload.result.questions);
    let prompts = align_prompts(&guide.prompts, &payload.result.prompts);
    let unmatched = answers.iter().filter(|a| !a.is_answered()).count();

    Reconciliation {
        filtered_count: filtered.len(),
        result_count: payload.result.questions.len(),
        unmatched,
        answers,
        prompts,
    }
}

/// Answer blocks for a guide that has never been analysed.
pub fn empty_answers(guide: &Guide) -> Vec<AnswerBlock> {
    let filtered = filter_questions(&guide.questions, &[], &guide.prompts);
    align_answers(&filtered, &[])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
