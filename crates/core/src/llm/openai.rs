use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, TextCompletion};
use crate::{
    error::{BookcastError, Result},
    provider::Provider,
};

/// Chat-completions client for OpenAI and the vendors exposing the same wire format
/// (Grok, Gemini's OpenAI-compatible endpoint).
pub struct OpenAiCompatible {
    client: reqwest::Client,
    provider: Provider,
    api_key: String,
    model: String,
}

impl OpenAiCompatible {
    pub fn new(client: reqwest::Client, provider: Provider, api_key: String, model: String) -> Self {
        Self {
            client,
            provider,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextCompletion for OpenAiCompatible {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let config = self.provider.config();
        let response = self
            .client
            .post(config.api_url)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                temperature,
                max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookcastError::ProviderStatus {
                provider: self.provider.name(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| BookcastError::InvalidProviderResponse {
                provider: self.provider.name(),
                reason: "response contained no choices".to_string(),
            })
    }
}
