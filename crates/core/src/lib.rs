pub mod assembler;
pub mod audio;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod format;
pub mod images;
pub mod llm;
pub mod media;
pub mod outline;
pub mod pipeline;
pub mod provider;
pub mod quiz;
pub mod render;
pub mod script;
pub mod segmenter;
pub mod store;
pub mod text;
pub mod tts;
pub mod types;

pub use assembler::{PlanAssembler, PlanContext, PlanSource, apply_narrations};
pub use audio::{AudioTimingBuilder, AudioTrack, default_slide_narration};
pub use config::{MediaBackend, ScriptMode, Settings};
pub use content::LessonContent;
pub use error::{BookcastError, Result, Stage};
pub use extract::{BookExtractor, extractor_for, ingest_book};
pub use format::{format_outline_readable, format_plan_readable, format_quiz_readable, format_timestamp};
pub use images::{ImageMatchOutcome, ImageMatcher};
pub use llm::{ChatMessage, Role, TextCompletion, completion_client};
pub use media::{MediaTool, media_tool};
pub use pipeline::{LessonPipeline, MediaStack, PlannedLesson, RenderedLesson};
pub use provider::{Provider, ProviderConfig, SpeechProvider};
pub use render::{RemotionRenderer, RenderProps, VideoRenderer};
pub use segmenter::SlideSegmenter;
pub use store::BookStore;
pub use tts::{SpeechSynthesizer, speech_client};
pub use types::{
    CourseOutline, ImageRecord, LessonOutline, LessonVideoPlan, QuizQuestion, Slide, SlideTiming,
};
