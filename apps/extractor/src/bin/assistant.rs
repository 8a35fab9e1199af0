use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use extractor::config::Config;
use extractor::llm_client::OllamaClient;
use extractor::routes::build_router;
use extractor::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = &config.rust_log;
            EnvFilter::new(format!(
                "{}={level},{}={level},tower_http={level}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_CRATE_NAME")
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JD assistant v{}", env!("CARGO_PKG_VERSION"));

    let llm = OllamaClient::new(&config.ollama_url, &config.model)?;
    info!("LLM client initialized (model: {})", llm.model());

    let state = AppState::new(Arc::new(llm), config.clone());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
