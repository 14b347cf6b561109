//! Generation provider implementations.

pub mod anthropic;
pub mod credentials;
pub mod fallback;
pub mod openai;
pub mod pricing;

pub use anthropic::AnthropicProvider;
pub use credentials::{ProviderCredentials, SecretString};
pub use fallback::FallbackGenerator;
pub use openai::OpenAIProvider;
