use std::cmp::Ordering;
use std::str::FromStr;

use kc_core::core::{GuideId, Interview, InterviewStatus};

// ---------------------------------------------------------------------------
// InterviewFilter — client-side narrowing of the interview table
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Draft,
    Generated,
    HumanEdited,
}

impl StatusKind {
    pub fn of(status: &InterviewStatus) -> Self {
        match status {
            InterviewStatus::Draft => StatusKind::Draft,
            InterviewStatus::Generated(_) => StatusKind::Generated,
            InterviewStatus::HumanEdited(_) => StatusKind::HumanEdited,
        }
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(StatusKind::Draft),
            "generated" => Ok(StatusKind::Generated),
            "human-edited" | "human-edit" => Ok(StatusKind::HumanEdited),
            other => Err(format!(
                "unknown status {other:?} (expected draft, generated or human-edited)"
            )),
        }
    }
}

/// Every set field must match. `search` is a case-insensitive substring over
/// farmer, village, interviewer, guide name and audio file.
#[derive(Clone, Debug, Default)]
pub struct InterviewFilter {
    pub guide_id: Option<GuideId>,
    pub village: Option<String>,
    pub status: Option<StatusKind>,
    pub search: Option<String>,
    pub human_edited_only: bool,
}

impl InterviewFilter {
    pub fn matches(&self, interview: &Interview) -> bool {
        if let Some(guide) = &self.guide_id {
            if interview.guide_id.as_ref() != Some(guide) {
                return false;
            }
        }

        if let Some(village) = &self.village {
            if !interview.village.trim().eq_ignore_ascii_case(village.trim()) {
                return false;
            }
        }

        if let Some(kind) = self.status {
            if StatusKind::of(&interview.status) != kind {
                return false;
            }
        }

        if self.human_edited_only && !interview.status.is_human_edited() {
            return false;
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    &interview.farmer_name,
                    &interview.village,
                    &interview.interviewer,
                    &interview.guide_name,
                    &interview.audio_file,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    pub fn apply<'a>(&self, interviews: &'a [Interview]) -> Vec<&'a Interview> {
        interviews.iter().filter(|i| self.matches(i)).collect()
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Date,
    Farmer,
    Village,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "farmer" => Ok(SortKey::Farmer),
            "village" => Ok(SortKey::Village),
            other => Err(format!(
                "unknown sort key {other:?} (expected date, farmer or village)"
            )),
        }
    }
}

/// Stable sort. Interviews without a date come last in both directions.
pub fn sort_interviews(interviews: &mut [Interview], key: SortKey, descending: bool) {
    interviews.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Date => match (a.date, b.date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Farmer => a.farmer_name.to_lowercase().cmp(&b.farmer_name.to_lowercase()),
            SortKey::Village => a.village.to_lowercase().cmp(&b.village.to_lowercase()),
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
