//! Runtime configuration.
//!
//! Settings are an explicit value handed to each component; nothing reads process-wide
//! state after [`Settings::load`] returns. TOML values override defaults, and a few
//! environment variables override TOML.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{BookcastError, Result},
    provider::{Provider, SpeechProvider},
};

pub const DATA_DIR_ENV: &str = "BOOKCAST_DATA_DIR";
pub const SCRIPT_MODE_ENV: &str = "BOOKCAST_SCRIPT_MODE";

/// Script verbosity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptMode {
    /// Short demo scripts, roughly 200-400 words.
    #[default]
    Test,
    /// Full-length scripts, roughly 1200-1600 words.
    Prod,
}

impl fmt::Display for ScriptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptMode::Test => f.write_str("test"),
            ScriptMode::Prod => f.write_str("prod"),
        }
    }
}

impl FromStr for ScriptMode {
    type Err = BookcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(ScriptMode::Test),
            "prod" => Ok(ScriptMode::Prod),
            other => Err(BookcastError::Config(format!(
                "unknown script mode {other:?} (expected \"test\" or \"prod\")"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    #[default]
    Ffmpeg,
    Wav,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: Provider,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    /// Overrides the provider's API key env var.
    pub api_key: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl LlmSettings {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.config().model.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub provider: SpeechProvider,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub api_key: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl TtsSettings {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.config().model.to_string())
    }

    pub fn voice(&self) -> String {
        self.voice
            .clone()
            .unwrap_or_else(|| self.provider.config().voice.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    pub mode: ScriptMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    /// Ask the LLM for slide headlines and bullets before falling back to keyword extraction.
    pub llm_headlines: bool,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            llm_headlines: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub backend: MediaBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Directory of the render project (where `npx remotion` runs).
    pub project_dir: PathBuf,
    /// Static asset root served to the renderer. Defaults to `{project_dir}/public`.
    pub public_dir: Option<PathBuf>,
    pub composition: String,
    pub command: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("video"),
            public_dir: None,
            composition: "LessonVideo".to_string(),
            command: "npx".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn public_dir(&self) -> PathBuf {
        self.public_dir
            .clone()
            .unwrap_or_else(|| self.project_dir.join("public"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub script: ScriptSettings,
    pub segmenter: SegmenterSettings,
    pub media: MediaSettings,
    pub render: RenderSettings,
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(mode) = lookup(SCRIPT_MODE_ENV).filter(|m| !m.trim().is_empty()) {
            self.script.mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("bookcast")
        .join("books")
}
