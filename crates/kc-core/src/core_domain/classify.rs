// ---------------------------------------------------------------------------
// Text classifier — rejects structural noise leaked from malformed guides
// ---------------------------------------------------------------------------

/// JSON keys that open a guide section when a file is split line by line.
const SECTION_KEYS: [&str; 2] = ["\"questions\":", "\"prompts\":"];

/// Characters that never carry question content on their own.
const STRUCTURAL_CHARS: [char; 9] = ['{', '}', '[', ']', ',', '"', '`', ':', '\''];

/// Returns `true` when `text` looks like a real question or prompt rather than
/// a syntax token from a guide that was split line by line.
///
/// This is a last-resort filter, not a parser: a line is rejected only when it
/// is empty, opens a `"questions":`/`"prompts":` section, or consists solely
/// of brackets, braces, commas, quotes, colons or backticks. Fragments of
/// multi-line JSON that contain words still pass.
pub fn is_valid_question_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    if SECTION_KEYS.iter().any(|key| trimmed.starts_with(key)) {
        return false;
    }

    !trimmed.chars().all(|c| STRUCTURAL_CHARS.contains(&c) || c.is_whitespace())
}

/// Strips JSON punctuation that survives naive line splitting: a trailing
/// comma, one pair of surrounding double quotes, and escaped quotes inside.
///
/// `  "What crops do you grow?",` becomes `What crops do you grow?`.
pub fn clean_guide_line(text: &str) -> String {
    let mut line = text.trim();
    if let Some(stripped) = line.strip_suffix(',') {
        line = stripped.trim_end();
    }
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') {
        line = &line[1..line.len() - 1];
    }
    line.replace("\\\"", "\"").trim().to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
