use serde::{Deserialize, Serialize};

use crate::error::{BookcastError, Result};

/// Text-completion vendors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Openai,
    Anthropic,
    Gemini,
    Grok,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o-mini",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Anthropic => ProviderConfig {
                api_url: "https://api.anthropic.com/v1/messages",
                model: "claude-3-5-haiku-20241022",
                env_var: "ANTHROPIC_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-1.5-flash",
                env_var: "GEMINI_API_KEY",
            },
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
            Provider::Grok => "Grok",
        }
    }

    /// Resolve the API key: an explicit configured key wins over the provider's env var.
    pub fn resolve_api_key(&self, configured: Option<&str>) -> Result<String> {
        resolve_key(configured, self.config().env_var)
    }
}

/// Speech-synthesis vendors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    #[default]
    Openai,
    Elevenlabs,
}

pub struct SpeechProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub voice: &'static str,
    pub env_var: &'static str,
}

impl SpeechProvider {
    pub fn config(&self) -> SpeechProviderConfig {
        match self {
            SpeechProvider::Openai => SpeechProviderConfig {
                api_url: "https://api.openai.com/v1/audio/speech",
                model: "tts-1",
                voice: "alloy",
                env_var: "OPENAI_API_KEY",
            },
            SpeechProvider::Elevenlabs => SpeechProviderConfig {
                api_url: "https://api.elevenlabs.io/v1/text-to-speech",
                model: "eleven_multilingual_v2",
                voice: "21m00Tcm4TlvDq8ikWAM",
                env_var: "ELEVENLABS_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpeechProvider::Openai => "OpenAI TTS",
            SpeechProvider::Elevenlabs => "ElevenLabs",
        }
    }

    pub fn resolve_api_key(&self, configured: Option<&str>) -> Result<String> {
        resolve_key(configured, self.config().env_var)
    }
}

fn resolve_key(configured: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| BookcastError::MissingApiKey {
            env_var: env_var.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_key_wins_over_environment() {
        let key = Provider::Grok
            .resolve_api_key(Some("  sk-configured "))
            .unwrap();
        assert_eq!(key, "sk-configured");
    }

    #[test]
    fn missing_key_names_the_env_var() {
        let err = resolve_key(None, "BOOKCAST_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(
            err,
            BookcastError::MissingApiKey { ref env_var } if env_var == "BOOKCAST_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
