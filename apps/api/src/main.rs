mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod resume;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::resume::compiler::PdfLatexCompiler;
use crate::resume::generator::ResumeGenerator;
use crate::resume::store::PgResumeStore;
use crate::resume::template::ResumeTemplate;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Texume API v{}", env!("CARGO_PKG_VERSION"));

    // A broken template is a deployment error, not a per-request one
    let template = ResumeTemplate::builtin()?;

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgResumeStore::new(db));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.llm_api_url.clone(),
        config.openai_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!(
        "LLM client initialized (model: {}, max_tokens: {}, temperature: {})",
        config.generation.model, config.generation.max_tokens, config.generation.temperature
    );

    let mut generator = ResumeGenerator::new(
        Arc::new(llm),
        store.clone(),
        template,
        config.generation.clone(),
    );

    // Initialize S3 / MinIO only when PDF compilation is on
    if let Some(storage) = &config.storage {
        let compiler = PdfLatexCompiler::from_config(storage).await;
        generator = generator.with_compiler(Arc::new(compiler));
        info!("PDF compilation enabled (bucket: {})", storage.s3_bucket);
    }

    let state = AppState {
        generator: Arc::new(generator),
        store,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
