//! Collaborator Clients
//!
//! Page verification and pin extraction are delegated to a language model.
//! The pipeline only sees the narrow capability traits in [`provider`]; the
//! Claude and Ollama clients and the [`AIRouter`] that picks between them
//! live here too.

use thiserror::Error;

pub mod claude;
pub mod ollama;
pub mod prompts;
pub mod provider;
pub mod router;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use provider::{AIProvider, ModelInfo, PageVerifier, PinExtractor};
pub use router::{AIRouter, ProviderSettings};

#[derive(Debug, Error)]
pub enum AIError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Rate limited. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("Missing API key or no provider available")]
    MissingApiKey,
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}
