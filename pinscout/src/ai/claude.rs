use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::ai::prompts;
use crate::ai::provider::{AIProvider, ModelInfo, PageVerifier, PinExtractor};
use crate::ai::AIError;
use crate::content::ContentBundle;
use crate::detection::review::PageSummary;
use crate::pins::PinData;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const EXTRACTION_MAX_TOKENS: u32 = 8192;
const VERIFICATION_MAX_TOKENS: u32 = 64;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    async fn send_request(&self, prompt: &str, max_tokens: u32) -> Result<String, AIError> {
        if self.api_key.is_empty() {
            return Err(AIError::MissingApiKey);
        }

        let request_body = ClaudeRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let mut retry_count = 0;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        loop {
            let response = self
                .client
                .post(CLAUDE_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", CLAUDE_API_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let claude_resp: ClaudeResponse = resp
                            .json()
                            .await
                            .map_err(|e| AIError::ParseError(format!("Failed to parse JSON: {}", e)))?;

                        return claude_resp
                            .content
                            .into_iter()
                            .find_map(|c| c.text)
                            .ok_or_else(|| {
                                AIError::InvalidResponse("Empty content array in response".to_string())
                            });
                    } else if status.as_u16() == 429 {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|h| h.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(delay_ms / 1000);

                        if retry_count < MAX_RETRIES {
                            retry_count += 1;
                            tracing::warn!(
                                "Rate limited. Retrying after {} seconds (attempt {}/{})",
                                retry_after,
                                retry_count,
                                MAX_RETRIES
                            );
                            sleep(Duration::from_secs(retry_after)).await;
                            delay_ms *= 2; // Exponential backoff
                            continue;
                        } else {
                            return Err(AIError::RateLimited { retry_after });
                        }
                    } else {
                        let error_text = resp
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());

                        return Err(AIError::ApiError {
                            status: status.as_u16(),
                            message: error_text,
                        });
                    }
                }
                Err(e) => {
                    if retry_count < MAX_RETRIES {
                        retry_count += 1;
                        tracing::warn!(
                            "Request failed: {}. Retrying in {}ms (attempt {}/{})",
                            e,
                            delay_ms,
                            retry_count,
                            MAX_RETRIES
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms *= 2; // Exponential backoff
                        continue;
                    } else {
                        return Err(AIError::RequestFailed(e));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PageVerifier for ClaudeClient {
    async fn verify(&self, summary: &PageSummary) -> Result<bool, AIError> {
        let prompt = prompts::build_verification_prompt(summary);
        let response_text = self.send_request(&prompt, VERIFICATION_MAX_TOKENS).await?;
        prompts::parse_verification_response(&response_text)
    }
}

#[async_trait]
impl PinExtractor for ClaudeClient {
    async fn extract_pins(
        &self,
        bundle: &ContentBundle,
        part_number: Option<&str>,
    ) -> Result<PinData, AIError> {
        let prompt = prompts::build_extraction_prompt(bundle, part_number);
        let response_text = self.send_request(&prompt, EXTRACTION_MAX_TOKENS).await?;
        let mut data = prompts::parse_extraction_response(&response_text)?;
        if data.extraction_method.is_none() {
            data.extraction_method = Some("claude".to_string());
        }
        Ok(data)
    }
}

#[async_trait]
impl AIProvider for ClaudeClient {
    fn name(&self) -> &str {
        "claude"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "claude".to_string(),
            model_name: self.model.clone(),
            is_local: false,
            context_window: 200000,
            supports_json: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}
