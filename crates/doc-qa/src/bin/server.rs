//! doc-qa server binary
//!
//! Run with: cargo run -p doc-qa --bin doc-qa-server

use doc_qa::{
    config::{QaConfig, RetrievalStrategy},
    providers::OllamaEmbedder,
    server::QaServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_qa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = QaConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {} ({} keys)", config.llm.model, config.llm.api_keys.len());
    tracing::info!("  - Retrieval: {:?}", config.retrieval.strategy);
    tracing::info!("  - Context budget: {} chars", config.retrieval.max_context_length);
    tracing::info!(
        "  - Batching: {} groups x {} sub-groups ({:?})",
        config.batching.groups,
        config.batching.sub_groups,
        config.batching.schedule
    );
    tracing::info!("  - Auth: {}", if config.auth.token.is_some() { "bearer" } else { "disabled" });

    if config.retrieval.strategy == RetrievalStrategy::Semantic {
        tracing::info!("Checking Ollama at {}...", config.embeddings.base_url);
        if OllamaEmbedder::new(config.embeddings.clone())?.health_check().await {
            tracing::info!("Ollama is running");
        } else {
            tracing::warn!(
                "Ollama not available at {}; selection will fall back to lexical",
                config.embeddings.base_url
            );
        }
    }

    let server = QaServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  Run: POST http://{}/api/v1/hackrx/run", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
