// analysis-service-rs/src/llm_client.rs
//
// HTTP client for the Gemini generateContent API
//
// This module provides:
// - Real HTTP calls to the Gemini API via reqwest
// - Model selection over a static, ordered candidate list
// - Explicit error classification so unavailability is visible in signatures
// - Configuration via environment variables
//
// Configuration (.env file):
// - GEMINI_API_KEY: API key; absent means the AI path is always unavailable
// - GEMINI_API_BASE: API base URL (defaults to the public Gemini endpoint)
// - LLM_TIMEOUT_SECS: request timeout in seconds (default: 60)

use std::env;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Analysis;

/// Model identifiers to try, in preference order. For each candidate both
/// the bare name and the `models/`-namespaced form are attempted; the first
/// attempt that produces a reply wins.
pub const MODEL_CANDIDATES: [&str; 5] = [
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-1.5-flash",
    "gemini-pro",
];

/// Document text beyond this many characters is silently dropped from the
/// prompt to protect against oversized payloads.
const MAX_PROMPT_CHARS: usize = 30_000;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Why the AI path could not produce a result. Every variant maps to the
/// same outcome for the caller: fall back to keyword analysis.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("no usable model in the candidate list")]
    NoUsableModel,

    #[error("model reply was not valid JSON: {0}")]
    MalformedReply(String),
}

/// Process-wide AI configuration, read once at startup and passed in
/// explicitly rather than read from globals.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        let api_base = env::var("GEMINI_API_BASE")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Configuration with no credential, for contexts where the AI path
    /// must be unavailable.
    pub fn unconfigured() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug)]
pub struct GeminiClient {
    http: Client,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Self {
        // Construction happens once at startup; a client that cannot be
        // built with the configured timeout must fail loudly rather than
        // silently fall back to default settings
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { http, config }
    }

    /// Whether an API key is present. A client without one degrades every
    /// request to fallback mode but is otherwise fully functional.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Analyze document text with the first usable Gemini model.
    ///
    /// Any failure along the way (no key, no reachable model, unparseable
    /// reply) is reported as an `LlmError`; nothing here panics or leaks
    /// transport errors to the caller.
    pub async fn analyze(&self, text: &str) -> Result<Analysis, LlmError> {
        let api_key = self.config.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let prompt = build_prompt(text);
        let reply = self.first_usable_reply(api_key, &prompt).await?;
        parse_model_reply(&reply)
    }

    /// Walk the candidate list until one attempt returns a reply.
    ///
    /// Each attempt is a full generateContent call; transport and status
    /// failures are logged and the next variant is tried. Once a model has
    /// replied, its reply is final — a bad reply is not retried elsewhere.
    async fn first_usable_reply(&self, api_key: &str, prompt: &str) -> Result<String, LlmError> {
        for model in MODEL_CANDIDATES {
            for variant in [model.to_string(), format!("models/{}", model)] {
                match self.generate(api_key, &variant, prompt).await {
                    Ok(reply) => {
                        log::info!("Model '{}' produced a reply", variant);
                        return Ok(reply);
                    }
                    Err(reason) => {
                        log::debug!("Model '{}' unavailable: {}", variant, reason);
                    }
                }
            }
        }

        log::warn!("No usable Gemini model found in the candidate list");
        Err(LlmError::NoUsableModel)
    }

    /// Execute a single generateContent attempt against one model variant.
    async fn generate(
        &self,
        api_key: &str,
        model_variant: &str,
        prompt: &str,
    ) -> Result<String, String> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.config.api_base, model_variant
        );

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status));
        }

        let data: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to decode response: {}", e))?;

        let reply: String = data
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err("no candidates in response".to_string());
        }

        Ok(reply)
    }
}

/// Example JSON shape embedded in the prompt so the model mirrors the
/// exact field names the wire contract uses.
static RESPONSE_SHAPE: Lazy<String> = Lazy::new(|| {
    serde_json::json!({
        "summary": ["Point 1", "Point 2", "Point 3", "Point 4", "Point 5"],
        "risks": [
            {
                "id": 1, "type": "High", "category": "Privacy",
                "title": "Risk Title", "explanation": "Why risky",
                "snippet": "Exact quote from text"
            }
        ]
    })
    .to_string()
});

/// Build the fixed analysis prompt with the document text truncated to its
/// first 30,000 characters.
fn build_prompt(text: &str) -> String {
    let cut = text
        .char_indices()
        .nth(MAX_PROMPT_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());

    format!(
        "You are a legal AI. Output valid JSON only. Do not use Markdown blocks. \
Exactly five points and do not number them. \
For risks, provide id, type (High/Medium/Low), category (e.g. Privacy, Liability), \
title, explanation, and a snippet from the text.\n\n\
Make the summary concise and the risks specific.\n\n\
Follow this JSON structure exactly:\n{}\n\n\
CONTRACT TEXT:\n{}",
        *RESPONSE_SHAPE,
        &text[..cut]
    )
}

/// Parse a model reply into an `Analysis`, tolerating a Markdown code
/// fence around the JSON. Keys beyond `summary` and `risks` are ignored;
/// absent keys become empty arrays. No further schema validation happens.
fn parse_model_reply(reply: &str) -> Result<Analysis, LlmError> {
    let body = strip_code_fence(reply.trim());

    let value: Value =
        serde_json::from_str(body).map_err(|e| LlmError::MalformedReply(e.to_string()))?;

    let summary = value
        .get("summary")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let risks = value
        .get("risks")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    Ok(Analysis { summary, risks })
}

/// Strip a wrapping triple-backtick fence (with an optional language tag)
/// from a reply. Replies without a fence pass through untouched.
fn strip_code_fence(reply: &str) -> &str {
    let Some(rest) = reply.strip_prefix("```") else {
        return reply;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
