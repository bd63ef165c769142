//! Assure API Server
//!
//! REST API server for the Assure compliance analysis service.

use assure_api::{create_router, state::AppState};
use assure_core::{config::AppConfig, ChunkRetriever};
use assure_rag::{AnalysisPipeline, AnthropicClient};
use assure_vector::{OpenAiEmbedding, QdrantRetriever};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first; the log level lives in it
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("assure_api={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    // Missing credentials fail here, before any traffic is served
    config.validate()?;

    let retriever: Option<Arc<dyn ChunkRetriever>> = match &config.vector {
        Some(vector_config) => {
            let embedder = Arc::new(OpenAiEmbedding::from_config(vector_config)?);
            let retriever = QdrantRetriever::new(vector_config, embedder)?;
            tracing::info!(
                collection = %vector_config.collection,
                "retrieval enabled against Qdrant"
            );
            Some(Arc::new(retriever))
        }
        None => {
            tracing::warn!("QDRANT_URL not set; retrieval disabled, answering from model knowledge");
            None
        }
    };

    let generator = Arc::new(AnthropicClient::from_config(&config.llm)?);
    let pipeline = Arc::new(AnalysisPipeline::new(
        retriever,
        generator,
        &config.rag,
        &config.llm,
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, pipeline));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Assure API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
