//! Per-lesson orchestration over the store and the collaborators.
//!
//! Every public operation is request-scoped and sequential. Failures surface as
//! [`BookcastError::StageFailed`] naming the stage that broke.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::{
    assembler::{PlanAssembler, PlanContext, apply_narrations},
    audio::{AudioTimingBuilder, AudioTrack},
    config::{ScriptMode, Settings},
    error::{BookcastError, Result, Stage, StageExt},
    images::{ImageMatchOutcome, ImageMatcher},
    llm::TextCompletion,
    media::MediaTool,
    outline::{generate_course_outline, guess_title},
    quiz::generate_quiz,
    render::{AssetStager, RenderProps, VideoRenderer},
    script::{ScriptRequest, generate_lesson_script},
    segmenter::SlideSegmenter,
    store::BookStore,
    tts::SpeechSynthesizer,
    types::{CourseOutline, LessonOutline, LessonVideoPlan, QuizQuestion},
};

/// Collaborators needed only once a plan is turned into audio and video.
pub struct MediaStack {
    pub tts: Box<dyn SpeechSynthesizer>,
    pub media: Box<dyn MediaTool>,
    pub renderer: Box<dyn VideoRenderer>,
    pub public_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LessonScript {
    pub lesson_id: String,
    pub script: String,
    pub path: PathBuf,
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedLesson {
    pub plan: LessonVideoPlan,
    pub source: &'static str,
    pub images: ImageMatchOutcome,
}

#[derive(Debug, Clone)]
pub struct RenderedLesson {
    pub lesson_index: usize,
    pub plan: LessonVideoPlan,
    pub source: &'static str,
    pub audio: AudioTrack,
    pub props_path: PathBuf,
    pub video_path: PathBuf,
}

pub struct LessonPipeline {
    store: BookStore,
    llm: Box<dyn TextCompletion>,
    script_mode: ScriptMode,
    llm_headlines: bool,
    assembler: PlanAssembler,
}

impl LessonPipeline {
    pub fn new(store: BookStore, llm: Box<dyn TextCompletion>, settings: &Settings) -> Self {
        Self {
            store,
            llm,
            script_mode: settings.script.mode,
            llm_headlines: settings.segmenter.llm_headlines,
            assembler: PlanAssembler::standard(),
        }
    }

    pub fn with_assembler(mut self, assembler: PlanAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    /// Generate and persist the outline for an ingested book.
    pub async fn create_outline(&self, book_id: &str) -> Result<CourseOutline> {
        let text = self.store.load_book_text(book_id).await.stage(Stage::Outline)?;
        let outline = generate_course_outline(self.llm.as_ref(), &text, guess_title(&text))
            .await
            .stage(Stage::Outline)?;
        self.store
            .save_outline(book_id, &outline)
            .await
            .stage(Stage::Outline)?;
        Ok(outline)
    }

    pub async fn outline(&self, book_id: &str) -> Result<CourseOutline> {
        self.store
            .load_outline(book_id)
            .await
            .ok_or_else(|| BookcastError::MissingOutline {
                book_id: book_id.to_string(),
            })
    }

    async fn lesson_entry(
        &self,
        book_id: &str,
        lesson_index: usize,
    ) -> Result<(CourseOutline, String, LessonOutline)> {
        let outline = self.outline(book_id).await?;
        let (lesson_id, lesson) =
            outline
                .lesson(lesson_index)
                .ok_or(BookcastError::LessonOutOfRange {
                    index: lesson_index,
                    count: outline.lessons.len(),
                })?;
        let lesson = lesson.clone();
        Ok((outline, lesson_id, lesson))
    }

    /// Narration script for one lesson. An existing script is reused unless `force`.
    pub async fn write_script(
        &self,
        book_id: &str,
        lesson_index: usize,
        mode: Option<ScriptMode>,
        force: bool,
    ) -> Result<LessonScript> {
        let (outline, lesson_id, lesson) = self
            .lesson_entry(book_id, lesson_index)
            .await
            .stage(Stage::Script)?;
        let path = self.store.script_path(book_id, &lesson_id);

        if !force {
            if let Some(script) = self.store.load_script(book_id, &lesson_id).await {
                return Ok(LessonScript {
                    lesson_id,
                    script,
                    path,
                    reused: true,
                });
            }
        }

        let book_text = self.store.load_book_text(book_id).await.ok();
        let request = ScriptRequest {
            lesson: &lesson,
            book_context: book_text.as_deref(),
            course_title: Some(outline.course_title.as_str()),
            mode: mode.unwrap_or(self.script_mode),
        };
        let script = generate_lesson_script(self.llm.as_ref(), &request)
            .await
            .stage(Stage::Script)?;
        let path = self
            .store
            .save_script(book_id, &lesson_id, &script)
            .await
            .stage(Stage::Script)?;

        Ok(LessonScript {
            lesson_id,
            script,
            path,
            reused: false,
        })
    }

    pub async fn write_quiz(&self, book_id: &str, lesson_index: usize) -> Result<Vec<QuizQuestion>> {
        let (_, lesson_id, lesson) = self
            .lesson_entry(book_id, lesson_index)
            .await
            .stage(Stage::Quiz)?;
        let quiz = generate_quiz(self.llm.as_ref(), &lesson)
            .await
            .stage(Stage::Quiz)?;
        if quiz.is_empty() {
            warn!(lesson = %lesson_id, "quiz came back empty");
        }
        self.store
            .save_quiz(book_id, &lesson_id, &quiz)
            .await
            .stage(Stage::Quiz)?;
        Ok(quiz)
    }

    /// Assemble a narrated plan with images matched. Never fails: missing material
    /// degrades through the plan sources down to the placeholder.
    pub async fn plan_lesson(&self, book_id: &str, lesson_index: usize) -> PlannedLesson {
        let outline = self.store.load_outline(book_id).await;
        let segmenter = if self.llm_headlines {
            SlideSegmenter::new(Some(self.llm.as_ref()))
        } else {
            SlideSegmenter::heuristic()
        };
        let ctx = PlanContext {
            store: &self.store,
            book_id,
            lesson_index,
            outline: outline.as_ref(),
            llm: Some(self.llm.as_ref()),
            segmenter: &segmenter,
        };

        let assembled = self.assembler.assemble(&ctx).await;
        let mut plan = assembled.plan;

        let script = self.store.load_script(book_id, &plan.lesson_id).await;
        apply_narrations(&mut plan.slides, script.as_deref());

        let images = self.store.load_images(book_id).await;
        let outcome = ImageMatcher::new(self.llm.as_ref())
            .match_images(&mut plan.slides, &images, &plan.title)
            .await;

        PlannedLesson {
            plan,
            source: assembled.source,
            images: outcome,
        }
    }

    /// Plan, voice and render one lesson.
    pub async fn produce_lesson_video(
        &self,
        book_id: &str,
        lesson_index: usize,
        stack: &MediaStack,
    ) -> Result<RenderedLesson> {
        let PlannedLesson {
            mut plan, source, ..
        } = self.plan_lesson(book_id, lesson_index).await;

        let segments_dir = self.store.segments_dir(book_id, &plan.lesson_id);
        let audio_path = self.store.lesson_audio_path(book_id, &plan.lesson_id);
        let audio = AudioTimingBuilder::new(stack.tts.as_ref(), stack.media.as_ref())
            .build(&mut plan, &segments_dir, &audio_path)
            .await
            .stage(Stage::Audio)?;

        let stager = AssetStager::new(&stack.public_dir, book_id);
        let audio_src = stager.stage(&audio.path).await.stage(Stage::Render)?;
        let avatar = self.store.avatar_path(book_id, lesson_index);
        let avatar_src = if avatar.exists() {
            Some(stager.stage(&avatar).await.stage(Stage::Render)?)
        } else {
            None
        };
        stager.stage_slide_images(&mut plan).await;

        let props = RenderProps {
            plan,
            audio_src,
            avatar_src,
        };
        let props_path = self.store.props_path(book_id, lesson_index);
        self.store
            .write_json(&props_path, &props)
            .await
            .stage(Stage::Render)?;

        let video_path = self.store.video_path(book_id, lesson_index);
        stack
            .renderer
            .render(&props.plan.lesson_id, &props_path, &video_path)
            .await
            .stage(Stage::Render)?;

        info!(book = book_id, lesson = lesson_index, video = %video_path.display(), "lesson rendered");
        Ok(RenderedLesson {
            lesson_index,
            plan: props.plan,
            source,
            audio,
            props_path,
            video_path,
        })
    }

    /// Render every lesson of the outline in order, stopping at the first failure.
    pub async fn produce_course(
        &self,
        book_id: &str,
        stack: &MediaStack,
    ) -> Result<Vec<RenderedLesson>> {
        let outline = self.outline(book_id).await.stage(Stage::Render)?;
        let mut rendered = Vec::with_capacity(outline.lessons.len());
        for lesson_index in 0..outline.lessons.len() {
            rendered.push(self.produce_lesson_video(book_id, lesson_index, stack).await?);
        }
        Ok(rendered)
    }
}
