// analysis-service-rs/src/models.rs
// Wire-level data types for the document analysis service

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a flagged clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskType {
    High,
    Medium,
    Low,
}

/// One flagged clause or concern, anchored to the source text by a snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub id: u32,
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub category: String,
    pub title: String,
    pub explanation: String,
    pub snippet: String,
}

/// Analysis output: a five-point summary plus zero or more risk records.
///
/// The AI path passes model-authored JSON through untyped (no schema
/// validation beyond a successful parse), so both fields are raw values.
/// The fallback path serializes typed `RiskRecord`s into the same shape.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub summary: Value,
    pub risks: Value,
}

/// Full response payload for a successful POST /analyze
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub text: String,
    pub summary: Value,
    pub risks: Value,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: i64,
    pub status: String,
}
