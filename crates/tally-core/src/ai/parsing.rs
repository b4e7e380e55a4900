//! Parsing helpers for AI backend responses
//!
//! Completion models rarely answer with the bare category name. These
//! functions strip labels, quotes and extra lines, then map the answer onto
//! the canonical category list.

use std::sync::OnceLock;

use regex::Regex;

/// Answers that carry no category
const JUNK_ANSWERS: &[&str] = &[
    "unknown",
    "categories",
    "category",
    "none",
    "n/a",
    "na",
    "null",
    "other",
    "uncategorized",
    "uncategorised",
];

fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(?:the\s+)?category\s*(?:is)?\s*[:=\-]?\s*").expect("valid regex"))
}

fn trim_decoration(s: &str) -> &str {
    s.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '“' | '”' | '«' | '»'))
        .trim()
        .trim_end_matches('.')
        .trim()
}

/// Clean a raw completion answer and resolve it against known categories
///
/// Resolution order:
/// 1. exact case-insensitive match (returns canonical casing)
/// 2. longest known category name contained in the answer
/// 3. the cleaned answer unchanged
///
/// Returns None for empty or junk answers.
pub fn clean_category_response(raw: &str, categories: &[String]) -> Option<String> {
    let trimmed = trim_decoration(raw);
    let unlabeled = label_regex().replace(trimmed, "");

    let first_line = unlabeled
        .lines()
        .map(trim_decoration)
        .find(|line| !line.is_empty())?;

    // A second label can survive on the first line after quotes were removed
    let answer = trim_decoration(&label_regex().replace(first_line, "")).to_string();

    if answer.is_empty() || JUNK_ANSWERS.contains(&answer.to_lowercase().as_str()) {
        return None;
    }

    Some(resolve_category(&answer, categories))
}

/// Map an answer onto the canonical list, falling back to the answer itself
pub fn resolve_category(answer: &str, categories: &[String]) -> String {
    if let Some(exact) = categories
        .iter()
        .find(|name| name.eq_ignore_ascii_case(answer))
    {
        return exact.clone();
    }

    let answer_lower = answer.to_lowercase();
    categories
        .iter()
        .filter(|name| answer_lower.contains(&name.to_lowercase()))
        .max_by_key(|name| name.len())
        .cloned()
        .unwrap_or_else(|| answer.to_string())
}
