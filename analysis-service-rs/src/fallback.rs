// analysis-service-rs/src/fallback.rs
// Deterministic keyword-based risk scan
//
// Used whenever the LLM path cannot produce a result. Scans the document
// for a fixed table of legal keywords and emits templated risk records
// with a snippet of surrounding text. Pure function, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{RiskRecord, RiskType};

/// Upper bound on records emitted per scan
const MAX_RISKS: usize = 6;

/// Snippet context window, in characters, around each match
const SNIPPET_BEFORE: usize = 40;
const SNIPPET_AFTER: usize = 60;

struct KeywordRule {
    word: &'static str,
    risk_type: RiskType,
    category: &'static str,
    explanation: &'static str,
    pattern: Regex,
}

fn rule(
    word: &'static str,
    risk_type: RiskType,
    category: &'static str,
    explanation: &'static str,
) -> KeywordRule {
    // Whole-word, case-insensitive. Keywords are plain ASCII words so the
    // pattern can be built by simple interpolation.
    let pattern = Regex::new(&format!(r"(?i)\b{}\b", word)).expect("invalid keyword pattern");
    KeywordRule {
        word,
        risk_type,
        category,
        explanation,
        pattern,
    }
}

/// Keyword table, in scan order. Matches are reported table-order first,
/// then document order within each keyword.
static KEYWORD_RULES: Lazy<Vec<KeywordRule>> = Lazy::new(|| {
    vec![
        rule(
            "arbitration",
            RiskType::High,
            "Legal Recourse",
            "Forced arbitration clause detected.",
        ),
        rule(
            "indemnify",
            RiskType::High,
            "Liability",
            "You may be liable for company costs.",
        ),
        rule(
            "sell",
            RiskType::High,
            "Privacy",
            "Data selling clause detected.",
        ),
        rule(
            "damages",
            RiskType::Medium,
            "Liability",
            "Limitation of liability detected.",
        ),
        rule(
            "termination",
            RiskType::Medium,
            "Operational",
            "Check termination rights.",
        ),
    ]
});

/// Scan text for known risky keywords and build templated risk records.
///
/// Ids are strictly increasing from 1 across all keywords. Emission stops
/// at a strict cap of 6 records.
pub fn scan(text: &str) -> Vec<RiskRecord> {
    let mut risks: Vec<RiskRecord> = Vec::new();

    'rules: for rule in KEYWORD_RULES.iter() {
        for found in rule.pattern.find_iter(text) {
            risks.push(RiskRecord {
                id: (risks.len() + 1) as u32,
                risk_type: rule.risk_type,
                category: rule.category.to_string(),
                title: format!("Clause regarding '{}'", rule.word),
                explanation: rule.explanation.to_string(),
                snippet: snippet(text, found.start(), found.end()),
            });
            if risks.len() >= MAX_RISKS {
                break 'rules;
            }
        }
    }

    risks
}

/// Build a snippet around a match: up to 40 characters of context before
/// the match start and 60 after the match end, clamped to the text bounds,
/// with newlines collapsed to spaces and the result trimmed.
fn snippet(text: &str, match_start: usize, match_end: usize) -> String {
    let from = text[..match_start]
        .char_indices()
        .rev()
        .nth(SNIPPET_BEFORE - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let to = text[match_end..]
        .char_indices()
        .nth(SNIPPET_AFTER)
        .map(|(idx, _)| match_end + idx)
        .unwrap_or(text.len());

    text[from..to].replace('\n', " ").trim().to_string()
}
