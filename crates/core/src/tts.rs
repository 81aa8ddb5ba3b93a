//! Speech-synthesis collaborators.

use async_trait::async_trait;
use serde_json::json;

use crate::{
    config::TtsSettings,
    error::{BookcastError, Result},
    llm::http_client,
    provider::SpeechProvider,
};

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return the encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// File extension of the container [`SpeechSynthesizer::synthesize`] produces.
    fn extension(&self) -> &'static str;
}

pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(SpeechProvider::Openai.config().api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
                "response_format": "wav",
            }))
            .send()
            .await?;
        read_audio(SpeechProvider::Openai, response).await
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}

pub struct ElevenLabsSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/{}?output_format=mp3_44100_128",
            SpeechProvider::Elevenlabs.config().api_url,
            self.voice
        );
        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .json(&json!({
                "text": text,
                "model_id": self.model,
            }))
            .send()
            .await?;
        read_audio(SpeechProvider::Elevenlabs, response).await
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }
}

async fn read_audio(provider: SpeechProvider, response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return Err(BookcastError::ProviderStatus {
            provider: provider.name(),
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(BookcastError::InvalidProviderResponse {
            provider: provider.name(),
            reason: "empty audio body".to_string(),
        });
    }
    Ok(bytes.to_vec())
}

pub fn speech_client(settings: &TtsSettings) -> Result<Box<dyn SpeechSynthesizer>> {
    let api_key = settings.provider.resolve_api_key(settings.api_key.as_deref())?;
    let client = http_client(settings.timeout_sec)?;
    Ok(match settings.provider {
        SpeechProvider::Openai => Box::new(OpenAiSpeech {
            client,
            api_key,
            model: settings.model(),
            voice: settings.voice(),
        }),
        SpeechProvider::Elevenlabs => Box::new(ElevenLabsSpeech {
            client,
            api_key,
            model: settings.model(),
            voice: settings.voice(),
        }),
    })
}
