use anyhow::{Context, Result};
use dotenvy::dotenv;
use recipe_extraction::{ProviderCredentials, SecretString};
use std::env;

const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SECONDARY_MODEL: &str = "claude-3-5-haiku-latest";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// OpenAI credentials (primary provider and embeddings)
    pub primary: ProviderCredentials,
    /// Anthropic credentials; secondary provider disabled when unset
    pub secondary: Option<ProviderCredentials>,
    pub extract_service_url: String,
    pub extract_service_token: Option<SecretString>,
    pub caption_service_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let primary_model =
            env::var("PRIMARY_MODEL").unwrap_or_else(|_| DEFAULT_PRIMARY_MODEL.to_string());
        let secondary_model =
            env::var("SECONDARY_MODEL").unwrap_or_else(|_| DEFAULT_SECONDARY_MODEL.to_string());

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            primary: ProviderCredentials::new(
                env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
                primary_model,
            ),
            secondary: env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(|key| ProviderCredentials::new(key, secondary_model)),
            extract_service_url: env::var("EXTRACT_SERVICE_URL")
                .context("EXTRACT_SERVICE_URL must be set")?,
            extract_service_token: env::var("EXTRACT_SERVICE_TOKEN").ok().map(SecretString::from),
            caption_service_url: env::var("CAPTION_SERVICE_URL").ok(),
        })
    }
}
