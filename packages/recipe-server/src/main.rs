// Main entry point for the recipe API server

use std::sync::Arc;

use anyhow::{Context, Result};
use recipe_extraction::{
    AnthropicProvider, CaptionServiceClient, ExtractServiceClient, FallbackGenerator,
    OpenAIProvider, PipelineConfig, PipelineDeps, RecipeParser, SqliteStore,
};
use recipe_server::{build_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_extraction=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting recipe extraction API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database (migrations run on connect)
    tracing::info!("Connecting to database...");
    let store = SqliteStore::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    let pipeline_config = PipelineConfig::default();

    // Providers
    let openai = OpenAIProvider::from_credentials(&config.primary)
        .context("Invalid primary provider credentials")?;
    let mut generator = FallbackGenerator::new(Arc::new(openai.clone()))
        .with_timeout(pipeline_config.generation_timeout());
    match &config.secondary {
        Some(creds) => {
            let anthropic = AnthropicProvider::from_credentials(creds)
                .context("Invalid secondary provider credentials")?;
            generator = generator.with_secondary(Arc::new(anthropic));
            tracing::info!(model = %creds.model, "Secondary provider enabled");
        }
        None => tracing::warn!("ANTHROPIC_API_KEY not set, running without a secondary provider"),
    }

    // Acquisition collaborators
    let mut extract = ExtractServiceClient::new(config.extract_service_url.as_str())
        .context("Failed to build extract service client")?;
    if let Some(token) = &config.extract_service_token {
        extract = extract.with_token(token.expose());
    }

    let mut deps = PipelineDeps::new(generator, Arc::new(store), Arc::new(extract))
        .with_embedder(Arc::new(openai))
        .with_config(pipeline_config);

    if let Some(url) = &config.caption_service_url {
        let captions = CaptionServiceClient::new(url.as_str())
            .context("Failed to build caption service client")?;
        deps = deps.with_caption_scraper(Arc::new(captions));
    }

    let parser = Arc::new(RecipeParser::new(deps));
    tracing::info!(prompt_version = %parser.prompt_version(), "Pipeline ready");

    // Build application
    let app = build_app(parser);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
