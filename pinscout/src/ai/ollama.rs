//! Ollama Client for Local AI
//!
//! Runs page verification and pin extraction against a local Ollama server,
//! for offline use or when no Claude key is configured.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::prompts;
use crate::ai::provider::{AIProvider, ModelInfo, PageVerifier, PinExtractor};
use crate::ai::AIError;
use crate::content::ContentBundle;
use crate::detection::review::PageSummary;
use crate::pins::PinData;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Client for interacting with Ollama
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32, // max tokens
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct OllamaModelList {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Check if Ollama is running and the model is available
    pub async fn health_check(&self) -> Result<bool, AIError> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    let models: OllamaModelList = response
                        .json()
                        .await
                        .map_err(|e| AIError::ParseError(e.to_string()))?;
                    Ok(models
                        .models
                        .iter()
                        .any(|m| m.name.starts_with(&self.model) || self.model.starts_with(&m.name)))
                } else {
                    Ok(false)
                }
            }
            Err(_) => Ok(false), // Ollama not running
        }
    }

    /// Generate a completion
    async fn generate(&self, prompt: &str, json: bool, max_tokens: i32) -> Result<String, AIError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            format: json.then(|| "json".to_string()),
            options: OllamaOptions {
                temperature: 0.1,
                num_predict: max_tokens,
                top_p: 0.9,
            },
        };

        tracing::debug!("Sending request to Ollama: {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout(REQUEST_TIMEOUT_SECS)
                } else {
                    AIError::RequestFailed(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AIError::ApiError { status, message });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AIError::ParseError(e.to_string()))?;

        Ok(ollama_response.response)
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
impl PageVerifier for OllamaClient {
    async fn verify(&self, summary: &PageSummary) -> Result<bool, AIError> {
        let prompt = prompts::build_verification_prompt(summary);
        let response = self.generate(&prompt, false, 32).await?;
        prompts::parse_verification_response(&response)
    }
}

#[async_trait]
impl PinExtractor for OllamaClient {
    async fn extract_pins(
        &self,
        bundle: &ContentBundle,
        part_number: Option<&str>,
    ) -> Result<PinData, AIError> {
        let prompt = prompts::build_extraction_prompt(bundle, part_number);
        let response = self.generate(&prompt, true, 4000).await?;
        let mut data = prompts::parse_extraction_response(&response)?;
        if data.extraction_method.is_none() {
            data.extraction_method = Some("ollama".to_string());
        }
        Ok(data)
    }
}

#[async_trait]
impl AIProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    fn model_info(&self) -> ModelInfo {
        // Estimate context window based on model name
        let context_window = if self.model.contains("70b") {
            8192
        } else if self.model.contains("mixtral") {
            32768
        } else {
            4096
        };

        ModelInfo {
            provider: "ollama".to_string(),
            model_name: self.model.clone(),
            is_local: true,
            context_window,
            supports_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let client = OllamaClient::default();
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert!(client.model_info().is_local);
    }

    #[test]
    fn test_request_format_field() {
        let request = OllamaRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            stream: false,
            format: None,
            options: OllamaOptions {
                temperature: 0.1,
                num_predict: 10,
                top_p: 0.9,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("format"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let client = OllamaClient::new(Some("http://127.0.0.1:9".to_string()), None);
        assert!(!client.is_available().await);
    }
}
