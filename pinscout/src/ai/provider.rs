//! AI Provider Traits
//!
//! The pipeline depends on two narrow capabilities: verifying that a page
//! holds pinout information, and extracting a pin list from the stitched
//! content. Providers (Claude, Ollama, test doubles) implement them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::AIError;
use crate::content::ContentBundle;
use crate::detection::review::PageSummary;
use crate::pins::PinData;

/// Decides whether an ambiguous page contains pinout information.
#[async_trait]
pub trait PageVerifier: Send + Sync {
    async fn verify(&self, summary: &PageSummary) -> Result<bool, AIError>;
}

/// Turns stitched datasheet content into a pin list and package guess.
#[async_trait]
pub trait PinExtractor: Send + Sync {
    /// `part_number` selects a package variant when the datasheet covers
    /// several.
    async fn extract_pins(
        &self,
        bundle: &ContentBundle,
        part_number: Option<&str>,
    ) -> Result<PinData, AIError>;
}

/// Information about an AI model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider name (e.g., "claude", "ollama")
    pub provider: String,

    /// Model name (e.g., "claude-sonnet-4-20250514", "llama3.1:8b")
    pub model_name: String,

    /// Whether this is a local model
    pub is_local: bool,

    /// Context window size in tokens
    pub context_window: usize,

    /// Whether the model reliably outputs JSON
    pub supports_json: bool,
}

/// A configured model backend offering both capabilities.
#[async_trait]
pub trait AIProvider: PageVerifier + PinExtractor {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Check if the provider is available/configured
    async fn is_available(&self) -> bool;

    /// Get model info
    fn model_info(&self) -> ModelInfo;
}
