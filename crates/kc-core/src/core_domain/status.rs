use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ModelName;

/// Suffix the backend appends to a model name for human-approved versions.
pub const HUMAN_EDIT_SUFFIX: &str = "-human-edit";

/// Wire literal for interviews that have not been analysed yet.
pub const DRAFT_STATUS: &str = "Draft";

// ---------------------------------------------------------------------------
// InterviewStatus — draft, machine-generated, or human-approved
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InterviewStatus {
    #[default]
    Draft,
    Generated(ModelName),
    HumanEdited(ModelName),
}

impl InterviewStatus {
    /// Reads the legacy wire string: `"Draft"`, a bare model name, or a model
    /// name carrying the `human-edit` marker.
    pub fn from_wire(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(DRAFT_STATUS) {
            return InterviewStatus::Draft;
        }
        if value.contains("human-edit") {
            let base = value
                .strip_suffix(HUMAN_EDIT_SUFFIX)
                .unwrap_or(value)
                .trim_end_matches('-');
            return InterviewStatus::HumanEdited(ModelName::new(base));
        }
        InterviewStatus::Generated(ModelName::new(value))
    }

    pub fn to_wire(&self) -> String {
        match self {
            InterviewStatus::Draft => DRAFT_STATUS.to_owned(),
            InterviewStatus::Generated(model) => model.to_string(),
            InterviewStatus::HumanEdited(model) => format!("{model}{HUMAN_EDIT_SUFFIX}"),
        }
    }

    pub fn is_human_edited(&self) -> bool {
        matches!(self, InterviewStatus::HumanEdited(_))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, InterviewStatus::Draft)
    }

    pub fn model(&self) -> Option<&ModelName> {
        match self {
            InterviewStatus::Draft => None,
            InterviewStatus::Generated(m) | InterviewStatus::HumanEdited(m) => Some(m),
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for InterviewStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for InterviewStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(InterviewStatus::from_wire(&s))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
