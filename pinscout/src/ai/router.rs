//! AI Router
//!
//! Routing between AI providers with fallback support. The router itself
//! implements both pipeline capabilities, so callers never pick a provider
//! by hand.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ai::claude::ClaudeClient;
use crate::ai::ollama::OllamaClient;
use crate::ai::provider::{AIProvider, PageVerifier, PinExtractor};
use crate::ai::AIError;
use crate::content::ContentBundle;
use crate::detection::review::PageSummary;
use crate::pins::PinData;

/// Provider selection, as read from the pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    /// "claude" or "ollama"
    pub preferred: String,
    pub claude_model: Option<String>,
    /// Register the Ollama client
    pub ollama_enabled: bool,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            preferred: "claude".to_string(),
            claude_model: None,
            ollama_enabled: true,
            ollama_url: None,
            ollama_model: None,
        }
    }
}

/// Router that manages multiple AI providers
pub struct AIRouter {
    claude_client: Option<Arc<ClaudeClient>>,
    ollama_client: Option<Arc<OllamaClient>>,
    preferred_provider: String,
}

impl AIRouter {
    /// Create a new router with no providers configured
    pub fn new() -> Self {
        Self {
            claude_client: None,
            ollama_client: None,
            preferred_provider: "claude".to_string(),
        }
    }

    /// Build a router from settings and an optional Claude API key.
    pub fn from_settings(settings: &ProviderSettings, claude_api_key: Option<String>) -> Self {
        let mut router = Self::new();
        if let Some(key) = claude_api_key {
            router.set_claude_api_key(key, settings.claude_model.clone());
        }
        if settings.ollama_enabled {
            router.set_ollama_config(settings.ollama_url.clone(), settings.ollama_model.clone());
        }
        router.preferred_provider = settings.preferred.clone();
        router
    }

    /// Configure the Claude client with an API key
    pub fn set_claude_api_key(&mut self, key: String, model: Option<String>) {
        if key.is_empty() {
            self.claude_client = None;
            return;
        }
        let client = match model {
            Some(model) => ClaudeClient::new(key).with_model(model),
            None => ClaudeClient::new(key),
        };
        self.claude_client = Some(Arc::new(client));
    }

    /// Configure the Ollama client
    pub fn set_ollama_config(&mut self, url: Option<String>, model: Option<String>) {
        self.ollama_client = Some(Arc::new(OllamaClient::new(url, model)));
    }

    /// Get the best available provider based on preference and availability
    pub async fn get_provider(&self) -> Option<Arc<dyn AIProvider>> {
        if self.preferred_provider == "ollama" {
            // Try Ollama first
            if let Some(ref client) = self.ollama_client {
                if client.is_available().await {
                    return Some(client.clone() as Arc<dyn AIProvider>);
                }
            }
            // Fallback to Claude
            if let Some(ref client) = self.claude_client {
                return Some(client.clone() as Arc<dyn AIProvider>);
            }
        } else {
            // Try Claude first
            if let Some(ref client) = self.claude_client {
                return Some(client.clone() as Arc<dyn AIProvider>);
            }
            // Fallback to Ollama
            if let Some(ref client) = self.ollama_client {
                if client.is_available().await {
                    return Some(client.clone() as Arc<dyn AIProvider>);
                }
            }
        }

        None
    }
}

impl Default for AIRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageVerifier for AIRouter {
    async fn verify(&self, summary: &PageSummary) -> Result<bool, AIError> {
        let provider = self.get_provider().await.ok_or(AIError::MissingApiKey)?;

        tracing::debug!(
            "Using AI provider: {} ({}) to verify page {}",
            provider.name(),
            provider.model_info().model_name,
            summary.page_index + 1
        );
        provider.verify(summary).await
    }
}

#[async_trait]
impl PinExtractor for AIRouter {
    async fn extract_pins(
        &self,
        bundle: &ContentBundle,
        part_number: Option<&str>,
    ) -> Result<PinData, AIError> {
        let provider = self.get_provider().await.ok_or(AIError::MissingApiKey)?;

        tracing::info!(
            "Using AI provider: {} ({}) for pin extraction",
            provider.name(),
            provider.model_info().model_name
        );
        provider.extract_pins(bundle, part_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_router_no_providers() {
        let router = AIRouter::new();
        assert!(router.get_provider().await.is_none());

        let summary = PageSummary {
            page_index: 0,
            text: String::new(),
            table_headers: vec![],
        };
        assert!(matches!(
            router.verify(&summary).await,
            Err(AIError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_router_with_claude() {
        let mut router = AIRouter::new();
        router.set_claude_api_key("test-key".to_string(), None);

        let provider = router.get_provider().await;
        assert!(provider.is_some());
        assert_eq!(provider.unwrap().name(), "claude");
    }

    #[tokio::test]
    async fn test_empty_key_clears_claude() {
        let mut router = AIRouter::new();
        router.set_claude_api_key("test-key".to_string(), None);
        router.set_claude_api_key(String::new(), None);
        assert!(router.get_provider().await.is_none());
    }

    #[tokio::test]
    async fn test_from_settings() {
        let settings = ProviderSettings {
            preferred: "ollama".to_string(),
            claude_model: Some("claude-test".to_string()),
            ollama_enabled: false,
            ..ProviderSettings::default()
        };
        let router = AIRouter::from_settings(&settings, Some("test-key".to_string()));

        // Ollama is not registered, so Claude is the fallback.
        let provider = router.get_provider().await.unwrap();
        assert_eq!(provider.name(), "claude");
        assert_eq!(provider.model_info().model_name, "claude-test");
    }

    #[tokio::test]
    async fn test_ollama_preference_falls_back_to_claude() {
        let settings = ProviderSettings {
            preferred: "ollama".to_string(),
            // Nothing listens here, so the health check fails.
            ollama_url: Some("http://127.0.0.1:9".to_string()),
            ..ProviderSettings::default()
        };
        let router = AIRouter::from_settings(&settings, Some("test-key".to_string()));
        let provider = router.get_provider().await.unwrap();
        assert_eq!(provider.name(), "claude");

        let offline = AIRouter::from_settings(&settings, None);
        assert!(offline.get_provider().await.is_none());
    }
}
