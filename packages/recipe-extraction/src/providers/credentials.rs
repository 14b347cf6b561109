//! Keys and model settings for the generation providers.
//!
//! Secrets live in `secrecy` memory and format as `[REDACTED]`, so anything
//! holding one can derive `Debug`.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

use crate::error::ProviderError;

/// An API key or service token.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Plaintext, for request headers only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Key, model and optional endpoint for one provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub api_key: SecretString,
    pub model: String,
    /// Proxy or gateway in front of the provider API
    pub base_url: Option<String>,
}

impl ProviderCredentials {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Reject a blank key before any request is made.
    pub fn ensure_configured(&self, provider: &str) -> Result<(), ProviderError> {
        if self.api_key.expose().trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} API key is empty",
                provider
            )));
        }
        Ok(())
    }
}
