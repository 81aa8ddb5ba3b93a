use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Pipeline stage a failure is attributed to when surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Outline,
    Script,
    Quiz,
    Audio,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Outline => "outline",
            Stage::Script => "script",
            Stage::Quiz => "quiz",
            Stage::Audio => "audio",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum BookcastError {
    #[error("Outline JSON could not be parsed: {reason}\nRaw model output:\n{raw}")]
    MalformedOutline { reason: String, raw: String },

    #[error("{provider} returned {status}: {body}")]
    ProviderStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid {provider} response: {reason}")]
    InvalidProviderResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("{tool} failed on {path}: {reason}")]
    MediaToolFailed {
        tool: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Render failed for {lesson_id}: {reason}")]
    RenderFailed { lesson_id: String, reason: String },

    #[error("Text extraction failed for {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("No extracted text found for book {book_id}")]
    MissingBookText { book_id: String },

    #[error("No outline found for book {book_id}")]
    MissingOutline { book_id: String },

    #[error("Lesson index {index} is out of range (outline has {count} lessons)")]
    LessonOutOfRange { index: usize, count: usize },

    #[error("Cannot build an audio track for lesson {lesson_id}: plan has no slides")]
    EmptyPlan { lesson_id: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<BookcastError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("WAV error: {0}")]
    WavError(#[from] hound::Error),
}

impl BookcastError {
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ BookcastError::StageFailed { .. } => already,
            other => BookcastError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BookcastError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookcastError>;

/// Extension for tagging a fallible call with the pipeline stage it belongs to.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}
