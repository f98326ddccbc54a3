use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kc_core::core::{Interview, InterviewId};

const RULE: &str = "--------------------------------------------------";
const HEAVY_RULE: &str = "==================================================";
const MISSING: &str = "-";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize interviews: {0}")]
    Json(#[from] serde_json::Error),
}

/// Plain-text rendering of one interview.
///
/// Header fields first, then prompts with their responses, then questions
/// with answers and supporting quotes. Not meant to be parsed back.
pub fn export_interview_text(interview: &Interview) -> String {
    InterviewText(interview).to_string()
}

/// All interviews, separated by a heavy rule.
pub fn export_bulk_text(interviews: &[Interview]) -> String {
    BulkText(interviews).to_string()
}

struct InterviewText<'a>(&'a Interview);

impl fmt::Display for InterviewText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interview = self.0;

        writeln!(f, "Interview {}", interview.id)?;
        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f, "Interviewer: {}", or_missing(&interview.interviewer))?;
        match interview.date {
            Some(date) => writeln!(f, "Date: {}", date.format("%Y-%m-%d"))?,
            None => writeln!(f, "Date: {MISSING}")?,
        }
        writeln!(f, "Village: {}", or_missing(&interview.village))?;
        writeln!(f, "Farmer: {}", or_missing(&interview.farmer_name))?;
        writeln!(f, "Guide: {}", or_missing(&interview.guide_name))?;
        writeln!(f, "Status: {}", interview.status)?;

        if !interview.prompts.is_empty() {
            writeln!(f)?;
            writeln!(f, "Prompts & Responses")?;
            writeln!(f, "{RULE}")?;
            for (n, prompt) in interview.prompts.iter().enumerate() {
                writeln!(f, "{}. {}", n + 1, prompt.prompt_text)?;
                writeln!(f, "   {}", answer_or_placeholder(&prompt.response))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Questions & Answers")?;
        writeln!(f, "{RULE}")?;
        for (n, block) in interview.answers.iter().enumerate() {
            writeln!(f, "Q{}. {}", n + 1, block.question)?;
            writeln!(f, "A: {}", answer_or_placeholder(&block.answer))?;
            for quote in &block.quotes {
                match quote.note.as_deref().filter(|n| !n.trim().is_empty()) {
                    Some(note) => writeln!(f, "   \"{}\" ({note})", quote.quote)?,
                    None => writeln!(f, "   \"{}\"", quote.quote)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct BulkText<'a>(&'a [Interview]);

impl fmt::Display for BulkText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Interviews: {}", self.0.len())?;
        for interview in self.0 {
            writeln!(f)?;
            writeln!(f, "{HEAVY_RULE}")?;
            write!(f, "{}", InterviewText(interview))?;
        }
        Ok(())
    }
}

/// `interview_{id}_{farmer}.txt` with the farmer name reduced to
/// `[A-Za-z0-9_-]`.
pub fn interview_filename(id: &InterviewId, farmer_name: &str) -> String {
    format!(
        "interview_{}_{}.txt",
        sanitize(id.as_str()),
        sanitize(farmer_name)
    )
}

/// `interviews_bulk_{YYYYMMDD_HHMMSS}.txt`.
pub fn bulk_filename(at: DateTime<Utc>) -> String {
    format!("interviews_bulk_{}.txt", at.format("%Y%m%d_%H%M%S"))
}

#[derive(Serialize)]
struct ExportJson<'a> {
    exported_at: DateTime<Utc>,
    count: usize,
    interviews: &'a [Interview],
}

pub fn export_to_json(
    interviews: &[Interview],
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let json = serde_json::to_string_pretty(&ExportJson {
        exported_at,
        count: interviews.len(),
        interviews,
    })?;
    Ok(json)
}

fn sanitize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn or_missing(value: &str) -> &str {
    if value.trim().is_empty() {
        MISSING
    } else {
        value
    }
}

fn answer_or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        "(no answer)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use kc_core::core::{
        AnswerBlock, AudioId, GuideId, InterviewStatus, ModelName, PromptBlock, Quote,
    };

    use super::*;

    fn sample() -> Interview {
        Interview {
            id: InterviewId::new("aud-7"),
            guide_id: Some(GuideId::new("g-1")),
            guide_name: "Kharif survey".to_owned(),
            interviewer: "Anita".to_owned(),
            date: NaiveDate::from_ymd_opt(2024, 7, 3),
            village: "Khandala".to_owned(),
            farmer_name: "Ramesh Kumar".to_owned(),
            audio_file: "ramesh.m4a".to_owned(),
            status: InterviewStatus::HumanEdited(ModelName::new("gpt-5.1")),
            answers: vec![
                AnswerBlock {
                    index: 0,
                    question: "What crops do you grow?".to_owned(),
                    answer: "Paddy and wheat".to_owned(),
                    quotes: vec![
                        Quote {
                            quote: "mostly paddy".to_owned(),
                            note: Some("00:42".to_owned()),
                        },
                        Quote {
                            quote: "wheat in rabi".to_owned(),
                            note: None,
                        },
                    ],
                    reasoning: None,
                },
                AnswerBlock {
                    index: 2,
                    question: "How much land do you own?".to_owned(),
                    answer: String::new(),
                    quotes: Vec::new(),
                    reasoning: None,
                },
            ],
            prompts: vec![PromptBlock {
                index: 0,
                prompt_text: "Describe a typical day".to_owned(),
                response: "Starts at dawn in the field".to_owned(),
            }],
            hindi_transcript: None,
            english_transcript: None,
            audio_id: AudioId::new("aud-7"),
        }
    }

    #[test]
    fn test_text_export_sections_in_order() {
        let text = export_interview_text(&sample());

        let header = text.find("Interviewer: Anita").expect("header");
        let prompts = text.find("Prompts & Responses").expect("prompts");
        let questions = text.find("Questions & Answers").expect("questions");
        assert!(header < prompts && prompts < questions);

        assert!(text.contains("Date: 2024-07-03"));
        assert!(text.contains("Village: Khandala"));
        assert!(text.contains("Farmer: Ramesh Kumar"));
        assert!(text.contains("Guide: Kharif survey"));
        assert!(text.contains("Status: gpt-5.1-human-edit"));
    }

    #[test]
    fn test_text_export_answers_and_quotes() {
        let text = export_interview_text(&sample());

        assert!(text.contains("Q1. What crops do you grow?\nA: Paddy and wheat\n"));
        assert!(text.contains("   \"mostly paddy\" (00:42)\n"));
        assert!(text.contains("   \"wheat in rabi\"\n"));
        assert!(text.contains("Q2. How much land do you own?\nA: (no answer)\n"));
        assert!(text.contains("1. Describe a typical day\n   Starts at dawn in the field\n"));
    }

    #[test]
    fn test_text_export_without_prompts_skips_section() {
        let mut interview = sample();
        interview.prompts.clear();
        interview.date = None;
        interview.village.clear();

        let text = export_interview_text(&interview);
        assert!(!text.contains("Prompts & Responses"));
        assert!(text.contains("Date: -"));
        assert!(text.contains("Village: -"));
    }

    #[test]
    fn test_bulk_export_contains_every_interview() {
        let mut second = sample();
        second.id = InterviewId::new("aud-8");
        second.farmer_name = "Sita Devi".to_owned();

        let text = export_bulk_text(&[sample(), second]);
        assert!(text.starts_with("Interviews: 2\n"));
        assert!(text.contains("Interview aud-7"));
        assert!(text.contains("Interview aud-8"));
        assert!(text.contains("Farmer: Sita Devi"));
    }

    #[test]
    fn test_interview_filename_sanitizes_farmer() {
        let name = interview_filename(&InterviewId::new("aud-7"), "Ramesh Kumar (Sr.)");
        assert_eq!(name, "interview_aud-7_Ramesh_Kumar__Sr__.txt");
    }

    #[test]
    fn test_interview_filename_non_ascii_replaced() {
        let name = interview_filename(&InterviewId::new("a1"), "रमेश");
        assert_eq!(name, "interview_a1_____.txt");
    }

    #[test]
    fn test_bulk_filename_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 7, 3, 9, 5, 1).single().expect("valid time");
        assert_eq!(bulk_filename(at), "interviews_bulk_20240703_090501.txt");
    }

    #[test]
    fn test_json_export_shape() {
        let at = Utc.with_ymd_and_hms(2024, 7, 3, 9, 5, 1).single().expect("valid time");
        let json = export_to_json(&[sample()], at).expect("serializes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["count"], 1);
        assert_eq!(value["interviews"][0]["farmerName"], "Ramesh Kumar");
        assert_eq!(value["interviews"][0]["status"], "gpt-5.1-human-edit");
        assert_eq!(value["interviews"][0]["answers"][0]["quotes"][0]["note"], "00:42");
    }
}
