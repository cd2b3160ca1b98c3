// analysis-service-rs/src/lib.rs
// Document risk analysis backend - HTTP surface
//
// Implements:
// - Multipart document upload with text extraction (PDF or plain text)
// - AI-backed risk analysis with deterministic keyword fallback
// - CORS for all origins and a request payload size limit
// - Health endpoint reporting AI configuration state

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

pub mod analyzer;
pub mod extract;
pub mod fallback;
pub mod llm_client;
pub mod models;

use llm_client::{GeminiClient, LlmConfig};
use models::{AnalysisResponse, HealthResponse};

/// Display name used in user-facing status messages
pub const SERVICE_NAME: &str = "LegalLens";

/// Default maximum request payload size (10MB)
pub const MAX_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Shared application state. The LLM client (and with it the AI credential)
/// is constructed once at startup; requests never re-read the environment.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<GeminiClient>,
}

impl AppState {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            llm: Arc::new(GeminiClient::new(config)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Terminal request failures. Every failure mode of the POST path maps to
/// exactly one of these; the Display strings are the wire-level messages.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Could not extract text")]
    EmptyText,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoFileUploaded | Self::NoFileSelected => StatusCode::BAD_REQUEST,
            Self::EmptyText => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            // Log the cause; the caller only sees the generic message
            log::error!("Server error: {}", detail);
        }

        (
            self.status(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// GET / - liveness check
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "live",
        "message": format!("{} Backend is Running!", SERVICE_NAME),
    }))
}

/// GET /health - health report with AI configuration state
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = START_TIME.elapsed().as_secs() as i64;

    // Missing AI credential degrades analysis quality but never availability
    let status = if state.llm.is_configured() {
        "SERVING"
    } else {
        "DEGRADED"
    };

    Json(HealthResponse {
        healthy: true,
        service_name: config_rs::get_formatted_service_name("ANALYSIS"),
        uptime_seconds: uptime,
        status: status.to_string(),
    })
}

/// GET /analyze - instructions for manual testing
async fn analyze_status_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "waiting",
        "message": "Send a POST request with a file to analyze.",
    }))
}

/// OPTIONS /analyze - CORS pre-flight acknowledgement
async fn analyze_preflight_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Answer OPTIONS /analyze ahead of the CORS layer.
///
/// The CORS layer synthesizes an empty-body response for every OPTIONS
/// request it sees, which would drop the `{"status":"ok"}` acknowledgement
/// body; this middleware runs outside it and attaches the permissive CORS
/// headers itself.
async fn preflight_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS && request.uri().path() == "/analyze" {
        let mut response = analyze_preflight_handler().await.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        );
        return response;
    }

    next.run(request).await
}

/// POST /analyze - full pipeline: extract text, analyze, shape response
async fn analyze_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    match process_upload(&state, multipart).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn process_upload(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<AnalysisResponse, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(format!("multipart read failed: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        if file_name.is_empty() {
            return Err(ApiError::NoFileSelected);
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(format!("upload read failed: {}", e)))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) = upload.ok_or(ApiError::NoFileUploaded)?;

    let text = extract::extract_text(&file_name, &bytes);
    if text.is_empty() {
        return Err(ApiError::EmptyText);
    }

    let analysis = analyzer::run(&state.llm, &text).await;

    Ok(AnalysisResponse {
        file_name,
        text,
        summary: analysis.summary,
        risks: analysis.risks,
    })
}

/// Build the service router with CORS, payload limiting and shared state.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Layer order matters: the preflight middleware is the outermost layer
    // so OPTIONS /analyze is answered with its JSON body before the CORS
    // layer can replace it with a bodiless preflight response
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route(
            "/analyze",
            get(analyze_status_handler).post(analyze_handler),
        )
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(cors)
        .layer(middleware::from_fn(preflight_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use serde_json::Value;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "x-test-boundary";

    fn test_router() -> Router {
        // No credential: the AI path is unavailable and every request
        // deterministically takes the fallback path
        build_router(AppState::new(LlmConfig::unconfigured()))
    }

    fn multipart_request(field_name: &str, file_name: Option<&str>, content: &[u8]) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match file_name {
            Some(name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field_name, name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field_name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_live() {
        let response = test_router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "live");
        assert_eq!(json["message"], "LegalLens Backend is Running!");
    }

    #[tokio::test]
    async fn test_health_degraded_without_api_key() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["healthy"], true);
        assert_eq!(json["service_name"], "analysis-service");
        assert_eq!(json["status"], "DEGRADED");
    }

    #[tokio::test]
    async fn test_analyze_get_reports_waiting() {
        let response = test_router()
            .oneshot(Request::get("/analyze").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["message"], "Send a POST request with a file to analyze.");
    }

    #[tokio::test]
    async fn test_analyze_options_reports_ok() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/analyze")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_analyze_browser_preflight_keeps_body() {
        // A browser preflight carries Origin and requested-method headers;
        // the acknowledgement body must survive the CORS layer for it too
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/analyze")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_post_without_file_field_is_rejected() {
        let request = multipart_request("document", Some("tos.txt"), b"some text");
        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "error": "No file uploaded" }));
    }

    #[tokio::test]
    async fn test_post_with_empty_filename_is_rejected() {
        let request = multipart_request("file", Some(""), b"");
        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "error": "No file selected" }));
    }

    #[tokio::test]
    async fn test_post_with_empty_content_is_unprocessable() {
        let request = multipart_request("file", Some("empty.txt"), b"");
        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "error": "Could not extract text" }));
    }

    #[tokio::test]
    async fn test_post_fallback_end_to_end() {
        let text = "This clause requires arbitration and indemnify the Company, \
you agree we may sell data upon termination due to damages.";
        let request = multipart_request("file", Some("tos.txt"), text.as_bytes());
        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;

        assert_eq!(json["fileName"], "tos.txt");
        assert_eq!(json["text"], text);

        let summary = json["summary"].as_array().unwrap();
        let expected: Vec<&str> = analyzer::FALLBACK_SUMMARY.to_vec();
        assert_eq!(summary.len(), 5);
        for (line, expected_line) in summary.iter().zip(expected) {
            assert_eq!(line, expected_line);
        }

        let risks = json["risks"].as_array().unwrap();
        assert_eq!(risks.len(), 5);
        let expected_keywords = ["arbitration", "indemnify", "sell", "damages", "termination"];
        for (index, (risk, keyword)) in risks.iter().zip(expected_keywords).enumerate() {
            assert_eq!(risk["id"], (index + 1) as u64);
            assert_eq!(risk["title"], format!("Clause regarding '{}'", keyword));
        }
    }

    #[tokio::test]
    async fn test_post_corrupt_pdf_is_unprocessable() {
        let request = multipart_request("file", Some("broken.pdf"), b"\x00\x01 not a pdf");
        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({ "error": "Could not extract text" }));
    }
}
