//! Builds a lesson plan from the best material available on disk.
//!
//! Sources are tried in priority order and the first one that yields a plan wins:
//! authored lesson content, an existing script, a freshly generated script, an
//! outline-only skeleton and finally a generic placeholder that always succeeds.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    audio::default_slide_narration,
    config::ScriptMode,
    llm::TextCompletion,
    script::{ScriptRequest, generate_lesson_script},
    segmenter::{MAX_BULLET_WORDS, SlideSegmenter, compress_phrase, plan_from_script},
    store::BookStore,
    text::{truncate_chars, truncate_words},
    types::{CourseOutline, LessonOutline, LessonVideoPlan, Slide},
};

/// Book context characters handed to an auto-generated script.
pub const GENERATED_SCRIPT_CONTEXT: usize = 10_000;

/// Everything a plan source may look at for one lesson.
pub struct PlanContext<'a> {
    pub store: &'a BookStore,
    pub book_id: &'a str,
    pub lesson_index: usize,
    pub outline: Option<&'a CourseOutline>,
    pub llm: Option<&'a dyn TextCompletion>,
    pub segmenter: &'a SlideSegmenter<'a>,
}

impl PlanContext<'_> {
    /// Outline entry for this lesson and its resolved id.
    pub fn lesson(&self) -> Option<(String, &LessonOutline)> {
        self.outline?.lesson(self.lesson_index)
    }

    fn lesson_title(&self, lesson: &LessonOutline) -> String {
        lesson.title_or_default(self.lesson_index)
    }
}

#[async_trait]
pub trait PlanSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// A complete plan, or `None` when this source has nothing to offer.
    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan>;
}

/// Authored `LessonContent`, used verbatim.
pub struct LessonContentSource;

#[async_trait]
impl PlanSource for LessonContentSource {
    fn name(&self) -> &'static str {
        "lesson-content"
    }

    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan> {
        let (lesson_id, _) = ctx.lesson()?;
        let content = ctx.store.load_content(ctx.book_id, &lesson_id).await?;
        Some(content.to_plan())
    }
}

/// A script already on disk, run through the segmenter.
pub struct ExistingScriptSource;

#[async_trait]
impl PlanSource for ExistingScriptSource {
    fn name(&self) -> &'static str {
        "existing-script"
    }

    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan> {
        let (lesson_id, lesson) = ctx.lesson()?;
        let script = ctx.store.load_script(ctx.book_id, &lesson_id).await?;
        if script.trim().is_empty() {
            return None;
        }
        let title = ctx.lesson_title(lesson);
        let snippet = canned_code_snippet(lesson);
        Some(plan_from_script(ctx.segmenter, &lesson_id, &title, &script, snippet).await)
    }
}

/// Generates a full-length script, persists it, then segments it.
pub struct GeneratedScriptSource;

#[async_trait]
impl PlanSource for GeneratedScriptSource {
    fn name(&self) -> &'static str {
        "generated-script"
    }

    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan> {
        let llm = ctx.llm?;
        let (lesson_id, lesson) = ctx.lesson()?;
        let book_text = ctx
            .store
            .load_book_text(ctx.book_id)
            .await
            .unwrap_or_default();
        let request = ScriptRequest {
            lesson,
            book_context: Some(truncate_chars(&book_text, GENERATED_SCRIPT_CONTEXT)),
            course_title: ctx.outline.map(|o| o.course_title.as_str()),
            mode: ScriptMode::Prod,
        };

        let script = match generate_lesson_script(llm, &request).await {
            Ok(script) if !script.trim().is_empty() => script,
            Ok(_) => {
                warn!(lesson = %lesson_id, "generated script was empty");
                return None;
            }
            Err(e) => {
                warn!(lesson = %lesson_id, error = %e, "script auto-generation failed");
                return None;
            }
        };
        if let Err(e) = ctx.store.save_script(ctx.book_id, &lesson_id, &script).await {
            warn!(lesson = %lesson_id, error = %e, "could not persist generated script");
        }

        let title = ctx.lesson_title(lesson);
        let snippet = canned_code_snippet(lesson);
        Some(plan_from_script(ctx.segmenter, &lesson_id, &title, &script, snippet).await)
    }
}

/// Slides assembled from the outline entry alone.
pub struct OutlineSkeletonSource;

#[async_trait]
impl PlanSource for OutlineSkeletonSource {
    fn name(&self) -> &'static str {
        "outline-skeleton"
    }

    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan> {
        let (lesson_id, lesson) = ctx.lesson()?;
        let quiz = ctx
            .store
            .load_quiz(ctx.book_id, &lesson_id)
            .await
            .unwrap_or_default();
        let questions: Vec<&str> = quiz.iter().map(|q| q.question.as_str()).collect();
        Some(outline_skeleton(
            &lesson_id,
            &ctx.lesson_title(lesson),
            lesson,
            &questions,
        ))
    }
}

/// Fixed two-slide plan used when there is no outline entry at all.
pub struct PlaceholderSource;

#[async_trait]
impl PlanSource for PlaceholderSource {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn try_build(&self, ctx: &PlanContext<'_>) -> Option<LessonVideoPlan> {
        Some(placeholder_plan(ctx.book_id, ctx.lesson_index))
    }
}

pub fn placeholder_plan(book_id: &str, lesson_index: usize) -> LessonVideoPlan {
    let mut concepts = Slide::new(
        "Core Concepts",
        vec!["Explain concept A".into(), "Demonstrate concept B".into()],
    );
    concepts.code_snippet = Some(r#"print("Hello from Lesson Video")"#.to_string());

    LessonVideoPlan {
        lesson_id: format!("{book_id}-lesson-{lesson_index}"),
        title: format!("Lesson {}", lesson_index + 1),
        slides: vec![
            Slide::new(
                "Introduction",
                vec![
                    "Set expectations for the lesson".into(),
                    "Highlight key takeaways".into(),
                ],
            ),
            concepts,
        ],
        total_duration_sec: 90,
        slide_timings: Vec::new(),
    }
}

const RAG_SNIPPET: &str = r#"# Simple RAG query flow
from typing import List
import numpy as np

def embed(text: str) -> np.ndarray:
    ...  # call your embedding model

def top_k(query: str, vectors: List[np.ndarray], chunks: List[str], k=5):
    q = embed(query)
    sims = [float(np.dot(q, v) / (np.linalg.norm(q)*np.linalg.norm(v))) for v in vectors]
    idx = np.argsort(sims)[::-1][:k]
    return [(chunks[i], sims[i]) for i in idx]

chunks = ["... doc chunk ..."]
vectors = [embed(c) for c in chunks]
hits = top_k("How do I chunk docs?", vectors, chunks)
"#;

const PROMPT_SNIPPET: &str = r#"# Grounded prompt assembly
def build_prompt(question: str, contexts: list[str]) -> str:
    formatted = "\n".join(f"[doc{i}] {c}" for i, c in enumerate(contexts, 1))
    return (
        "You are a grounded assistant. Use only the provided docs.\n\n"
        f"Question: {question}\n\n"
        f"Context:\n{formatted}\n\n"
        "If unsure, say you don't know. Cite doc ids."
    )

prompt = build_prompt("Explain chunk overlap", ["chunking with 20-30% overlap helps continuity"])
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SketchTopic {
    Retrieval,
    Prompting,
}

fn sketch_topic(lesson: &LessonOutline) -> Option<SketchTopic> {
    let title = lesson.title.to_lowercase();
    let any_point = |needle: &str| {
        lesson
            .key_points
            .iter()
            .any(|kp| kp.to_lowercase().contains(needle))
    };
    if title.contains("rag") || any_point("retriev") {
        Some(SketchTopic::Retrieval)
    } else if title.contains("prompt") || any_point("prompt") {
        Some(SketchTopic::Prompting)
    } else {
        None
    }
}

/// Canned snippet picked by keywords in the lesson title and key points.
pub fn canned_code_snippet(lesson: &LessonOutline) -> Option<&'static str> {
    match sketch_topic(lesson)? {
        SketchTopic::Retrieval => Some(RAG_SNIPPET),
        SketchTopic::Prompting => Some(PROMPT_SNIPPET),
    }
}

fn sketch_bullets(topic: SketchTopic) -> Vec<String> {
    let bullets: &[&str] = match topic {
        SketchTopic::Retrieval => &[
            "Chunk docs (200-400 tokens, 20-30% overlap)",
            "Embed and store vectors with metadata",
            "Top-k search with similarity threshold",
            "Trim to top context and ground the prompt",
        ],
        SketchTopic::Prompting => &[
            "Keep system lean: ground in provided chunks",
            "User: question + cited context list",
            "Enforce 'I don't know' when evidence missing",
        ],
    };
    bullets.iter().map(|b| b.to_string()).collect()
}

const SKELETON_SECONDS_PER_SLIDE: u32 = 35;
const SKELETON_ENRICH_LIMIT: usize = 4;
const SKELETON_MAX_BULLETS: usize = 5;

/// Overview, grouped key points, quiz preview and an implementation sketch.
pub fn outline_skeleton(
    lesson_id: &str,
    title: &str,
    lesson: &LessonOutline,
    quiz_questions: &[&str],
) -> LessonVideoPlan {
    let summary_bullets: Vec<String> = lesson
        .summary
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| compress_phrase(s, MAX_BULLET_WORDS))
        .filter(|s| !s.is_empty())
        .take(4)
        .collect();

    let mut slides = Vec::new();
    if !summary_bullets.is_empty() {
        slides.push(Slide::new(format!("{title} Overview"), summary_bullets.clone()));
    }
    for (n, chunk) in lesson.key_points.chunks(3).enumerate() {
        let bullets = chunk
            .iter()
            .map(|kp| truncate_words(kp, MAX_BULLET_WORDS))
            .filter(|kp| !kp.is_empty())
            .collect();
        slides.push(Slide::new(format!("Key Takeaways {}", n + 1), bullets));
    }
    let quiz_bullets: Vec<String> = quiz_questions
        .iter()
        .take(2)
        .enumerate()
        .map(|(n, q)| truncate_words(&format!("Q{}: {q}", n + 1), MAX_BULLET_WORDS))
        .collect();
    if !quiz_bullets.is_empty() {
        slides.push(Slide::new("Quiz Preview", quiz_bullets));
    }

    for slide in &mut slides {
        if slide.bullets.len() >= SKELETON_ENRICH_LIMIT {
            continue;
        }
        for bullet in &summary_bullets {
            if slide.bullets.len() >= SKELETON_MAX_BULLETS {
                break;
            }
            if !slide.bullets.contains(bullet) {
                slide.bullets.push(bullet.clone());
            }
        }
    }

    let snippet = canned_code_snippet(lesson);
    if let Some(topic) = sketch_topic(lesson) {
        let mut sketch = Slide::new("Implementation Sketch", sketch_bullets(topic));
        sketch.code_snippet = snippet.map(str::to_string);
        slides.push(sketch);
    }

    if slides.is_empty() {
        slides.push(Slide::new(
            title,
            vec!["Lesson highlights will appear here.".into()],
        ));
    }
    if let Some(code) = snippet {
        if slides.iter().all(|s| s.code_snippet.is_none()) {
            slides[0].code_snippet = Some(code.to_string());
        }
    }

    let total_duration_sec = (slides.len() as u32 * SKELETON_SECONDS_PER_SLIDE).max(60);
    LessonVideoPlan {
        lesson_id: lesson_id.to_string(),
        title: title.to_string(),
        slides,
        total_duration_sec,
        slide_timings: Vec::new(),
    }
}

/// `text` split into `parts` runs of words with proportional boundaries.
pub fn split_text_evenly(text: &str, parts: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let n = words.len();
    (0..parts)
        .map(|i| {
            let start = (2 * i * n + parts) / (2 * parts);
            let end = (2 * (i + 1) * n + parts) / (2 * parts);
            words[start..end].join(" ")
        })
        .collect()
}

/// Fill in narration for slides that have none.
///
/// When at least half the slides are already narrated (segmenter output), only the
/// gaps get the title-and-bullets default. Otherwise the raw script, if any, is split
/// evenly across the slides.
pub fn apply_narrations(slides: &mut [Slide], script: Option<&str>) {
    if slides.is_empty() {
        return;
    }
    let narrated = slides.iter().filter(|s| s.has_narration()).count();
    let segments = if narrated * 2 >= slides.len() {
        Vec::new()
    } else {
        script
            .filter(|s| !s.trim().is_empty())
            .map(|s| split_text_evenly(s, slides.len()))
            .unwrap_or_default()
    };

    for (idx, slide) in slides.iter_mut().enumerate() {
        if slide.has_narration() {
            continue;
        }
        let candidate = segments.get(idx).map(|s| s.trim()).unwrap_or_default();
        slide.narration = if candidate.is_empty() {
            default_slide_narration(slide)
        } else {
            candidate.to_string()
        };
    }
}

/// A plan together with the source that produced it.
#[derive(Debug, Clone)]
pub struct AssembledPlan {
    pub plan: LessonVideoPlan,
    pub source: &'static str,
}

pub struct PlanAssembler {
    sources: Vec<Box<dyn PlanSource>>,
}

impl PlanAssembler {
    pub fn new(sources: Vec<Box<dyn PlanSource>>) -> Self {
        Self { sources }
    }

    /// The full chain, richest source first.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(LessonContentSource),
            Box::new(ExistingScriptSource),
            Box::new(GeneratedScriptSource),
            Box::new(OutlineSkeletonSource),
            Box::new(PlaceholderSource),
        ])
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// First plan any source produces. Slide-less plans are skipped so callers always
    /// get at least one slide.
    pub async fn assemble(&self, ctx: &PlanContext<'_>) -> AssembledPlan {
        for source in &self.sources {
            match source.try_build(ctx).await {
                Some(plan) if !plan.slides.is_empty() => {
                    info!(
                        source = source.name(),
                        lesson = %plan.lesson_id,
                        slides = plan.slides.len(),
                        "lesson plan assembled"
                    );
                    return AssembledPlan {
                        plan,
                        source: source.name(),
                    };
                }
                Some(_) => warn!(source = source.name(), "plan source produced no slides"),
                None => debug!(source = source.name(), "plan source unavailable"),
            }
        }
        AssembledPlan {
            plan: placeholder_plan(ctx.book_id, ctx.lesson_index),
            source: "placeholder",
        }
    }
}
