// analysis-service-rs/src/main.rs
// Main entry point for the document risk analysis backend

use dotenv::dotenv;

use analysis_service::llm_client::LlmConfig;
use analysis_service::{build_router, AppState, SERVICE_NAME};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Get bind address from standard configuration
    let addr = config_rs::get_bind_address("ANALYSIS", 5000);

    // AI credential is read once here and passed in; requests never
    // touch the environment
    let config = LlmConfig::from_env();
    if config.api_key.is_some() {
        log::info!("Gemini API key configured; AI analysis enabled");
    } else {
        log::warn!("No Gemini API key found; all requests will use fallback keyword matching");
    }

    let state = AppState::new(config);
    let app = build_router(state);

    log::info!("{} backend starting on {}", SERVICE_NAME, addr);
    println!("{} backend listening on {}", SERVICE_NAME, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
