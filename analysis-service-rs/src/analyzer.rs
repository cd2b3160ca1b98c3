// analysis-service-rs/src/analyzer.rs
// Analysis orchestration: AI first, keyword fallback second
//
// The two strategies are never mixed: a response is either fully
// model-authored or fully template-authored.

use serde_json::Value;

use crate::fallback;
use crate::llm_client::GeminiClient;
use crate::models::Analysis;

/// Canned summary used whenever the AI path is unavailable. Always exactly
/// five lines, matching the summary-length invariant of the AI prompt.
pub const FALLBACK_SUMMARY: [&str; 5] = [
    "AI Analysis unavailable.",
    "Using keyword matching.",
    "Review document manually.",
    "Check API Key configuration.",
    "Standard legal terms found.",
];

/// Produce an analysis for extracted document text.
///
/// The AI result is used verbatim when available. On any failure (missing
/// key, no usable model, malformed reply, transport error) the keyword scan
/// takes over silently; degradation is communicated only through the
/// summary text itself, never as an error.
pub async fn run(client: &GeminiClient, text: &str) -> Analysis {
    log::info!("Attempting AI analysis");
    match client.analyze(text).await {
        Ok(analysis) => analysis,
        Err(reason) => {
            log::warn!("AI analysis unavailable ({}), using fallback mode", reason);
            fallback_analysis(text)
        }
    }
}

fn fallback_analysis(text: &str) -> Analysis {
    let risks = fallback::scan(text);
    let summary: Vec<Value> = FALLBACK_SUMMARY
        .iter()
        .map(|line| Value::String(line.to_string()))
        .collect();

    Analysis {
        summary: Value::Array(summary),
        // Typed records serialize infallibly
        risks: serde_json::to_value(risks).unwrap_or_else(|_| Value::Array(Vec::new())),
    }
}
