#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bookcast_core::{
    BookcastError, ChatMessage, Result, SpeechSynthesizer, TextCompletion, VideoRenderer,
};
use hound::{SampleFormat, WavSpec, WavWriter};

pub const SAMPLE_RATE: u32 = 8000;

/// Completion stub that replays queued replies and records every request. Clones
/// share state, so a test can keep a handle after boxing one.
#[derive(Clone, Default)]
pub struct StubCompletion {
    replies: Arc<Mutex<VecDeque<Result<String>>>>,
    fallback: Option<String>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl StubCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` whenever the queue is empty.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(BookcastError::InvalidProviderResponse {
                provider: "stub",
                reason: reason.to_string(),
            }));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// User message of the `n`th request.
    pub fn user_prompt(&self, n: usize) -> String {
        self.requests.lock().unwrap()[n]
            .iter()
            .filter(|m| m.role == bookcast_core::Role::User)
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextCompletion for StubCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        match &self.fallback {
            Some(text) => Ok(text.clone()),
            None => Err(BookcastError::InvalidProviderResponse {
                provider: "stub",
                reason: "no reply queued".to_string(),
            }),
        }
    }
}

/// Mono 16-bit WAV of `seconds` length, built in memory.
pub fn wav_bytes(seconds: f64) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for _ in 0..(seconds * SAMPLE_RATE as f64).round() as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// Speech stub: half a second of silence per word. Records the text it was given.
#[derive(Clone, Default)]
pub struct StubSpeech {
    texts: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl StubSpeech {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn seconds_for(text: &str) -> f64 {
        text.split_whitespace().count() as f64 * 0.5
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(BookcastError::ProviderStatus {
                provider: "stub",
                status: 500,
                body: "speech backend down".to_string(),
            });
        }
        Ok(wav_bytes(Self::seconds_for(text)))
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}

/// Renderer stub that records the props document and writes an empty video file.
#[derive(Clone, Default)]
pub struct StubRenderer {
    rendered: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl StubRenderer {
    pub fn rendered(&self) -> Vec<(String, PathBuf)> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoRenderer for StubRenderer {
    async fn render(&self, lesson_id: &str, props: &Path, output: &Path) -> Result<()> {
        self.rendered
            .lock()
            .unwrap()
            .push((lesson_id.to_string(), props.to_path_buf()));
        std::fs::write(output, b"")?;
        Ok(())
    }
}

pub const RAG_SCRIPT: &str = "RAG retrieves documents. It embeds text into vectors. It ranks by similarity. It grounds the LLM response.";

pub const OUTLINE_JSON: &str = r#"{
  "course_title": "Practical RAG",
  "target_audience": "Backend developers",
  "lessons": [
    {
      "id": "lesson_1",
      "title": "Retrieval Basics",
      "summary": "Why retrieval helps. How documents are found.",
      "key_points": ["p1", "p2", "p3", "p4", "p5", "p6"]
    },
    {
      "id": "lesson_2",
      "title": "Evaluation",
      "summary": "Measuring answer quality.",
      "key_points": ["Faithfulness", "Relevance"]
    }
  ]
}"#;
