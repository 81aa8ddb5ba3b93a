use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, Role, TextCompletion};
use crate::{
    error::{BookcastError, Result},
    provider::Provider,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The messages API refuses requests without `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicMessages {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicMessages {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic takes the system prompt as a top-level field, not as a message.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let rest = messages.iter().filter(|m| m.role != Role::System).collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, rest)
}

#[async_trait]
impl TextCompletion for AnthropicMessages {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let (system, conversation) = split_system(messages);
        let response = self
            .client
            .post(Provider::Anthropic.config().api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                system,
                messages: conversation,
                temperature,
                max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookcastError::ProviderStatus {
                provider: Provider::Anthropic.name(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
