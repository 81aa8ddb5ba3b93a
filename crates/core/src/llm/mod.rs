//! Text-completion collaborators.
//!
//! The pipeline only depends on [`TextCompletion`]; one implementation exists per
//! wire protocol and [`completion_client`] picks it from [`LlmSettings`].

mod anthropic;
mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicMessages;
pub use openai::OpenAiCompatible;

use crate::{config::LlmSettings, error::Result, provider::Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String>;
}

const DEFAULT_TIMEOUT_SEC: u64 = 180;

fn request_timeout(timeout_sec: Option<u64>) -> Duration {
    Duration::from_secs(timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SEC))
}

/// HTTP client shared by the vendor collaborators, with a per-request timeout.
pub(crate) fn http_client(timeout_sec: Option<u64>) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(request_timeout(timeout_sec))
        .build()?)
}
/// Build the completion client for the configured provider.
///
/// Fails with [`crate::BookcastError::MissingApiKey`] when no key is configured.
pub fn completion_client(settings: &LlmSettings) -> Result<Box<dyn TextCompletion>> {
    let api_key = settings.provider.resolve_api_key(settings.api_key.as_deref())?;
    let client = http_client(settings.timeout_sec)?;

    Ok(match settings.provider {
        Provider::Anthropic => Box::new(AnthropicMessages::new(client, api_key, settings.model())),
        provider => Box::new(OpenAiCompatible::new(
            client,
            provider,
            api_key,
            settings.model(),
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_to_three_minutes() {
        assert_eq!(request_timeout(None), Duration::from_secs(180));
        assert_eq!(request_timeout(Some(30)), Duration::from_secs(30));
    }
}
