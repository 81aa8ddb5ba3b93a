mod common;

use bookcast_core::{
    BookStore, BookcastError, CourseOutline, ImageMatchOutcome, LessonPipeline, MediaStack,
    RenderProps, Settings, Stage, media::WavTool,
};
use common::{OUTLINE_JSON, RAG_SCRIPT, StubCompletion, StubRenderer, StubSpeech};
use tempfile::TempDir;

const BOOK: &str = "book-1";

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.segmenter.llm_headlines = false;
    settings
}

async fn seeded_store(dir: &TempDir) -> BookStore {
    let store = BookStore::new(dir.path().join("books"));
    let outline: CourseOutline = serde_json::from_str(OUTLINE_JSON).unwrap();
    store.save_outline(BOOK, &outline).await.unwrap();
    store
        .save_book_text(BOOK, "Practical RAG\n\nRetrieval augments generation.")
        .await
        .unwrap();
    store
}

fn pipeline(store: BookStore, llm: &StubCompletion) -> LessonPipeline {
    LessonPipeline::new(store, Box::new(llm.clone()), &settings())
}

#[tokio::test]
async fn authored_content_wins_over_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store.save_script(BOOK, "lesson_1", RAG_SCRIPT).await.unwrap();
    store
        .write_json(
            &store.content_path(BOOK, "lesson_1"),
            &serde_json::json!({
                "lesson_id": "lesson_1",
                "title": "Authored",
                "estimated_minutes": 3,
                "sections": [{
                    "section_id": "s1",
                    "title": "Section",
                    "slides": [{
                        "headline": "Hand Written",
                        "bullet_points": ["Exact bullet"],
                        "narration": "Authored narration."
                    }]
                }]
            }),
        )
        .await
        .unwrap();
    let llm = StubCompletion::new();

    let planned = pipeline(store, &llm).plan_lesson(BOOK, 0).await;

    assert_eq!(planned.source, "lesson-content");
    assert_eq!(planned.plan.slides.len(), 1);
    assert_eq!(planned.plan.slides[0].title, "Hand Written");
    assert_eq!(planned.plan.slides[0].narration, "Authored narration.");
    assert_eq!(planned.plan.total_duration_sec, 180);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn existing_script_is_segmented_without_llm_calls() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store.save_script(BOOK, "lesson_1", RAG_SCRIPT).await.unwrap();
    let llm = StubCompletion::new();

    let planned = pipeline(store, &llm).plan_lesson(BOOK, 0).await;

    assert_eq!(planned.source, "existing-script");
    assert_eq!(planned.plan.lesson_id, "lesson_1");
    assert_eq!(planned.plan.title, "Retrieval Basics");
    assert_eq!(planned.plan.slides.len(), 4);
    assert_eq!(planned.plan.slides[1].narration, "It embeds text into vectors.");
    assert_eq!(planned.images, ImageMatchOutcome::Skipped);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn missing_script_is_generated_in_prod_mode_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let llm = StubCompletion::new().reply(RAG_SCRIPT);

    let pipeline = pipeline(store, &llm);
    let planned = pipeline.plan_lesson(BOOK, 0).await;

    assert_eq!(planned.source, "generated-script");
    assert_eq!(planned.plan.slides.len(), 4);
    let prompt = llm.user_prompt(0);
    assert!(prompt.contains("6. p6"));
    assert!(prompt.contains("Retrieval augments generation."));
    assert_eq!(
        pipeline.store().load_script(BOOK, "lesson_1").await.as_deref(),
        Some(RAG_SCRIPT)
    );
}

#[tokio::test]
async fn failed_generation_degrades_to_outline_skeleton() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store
        .save_quiz(
            BOOK,
            "lesson_1",
            &[bookcast_core::QuizQuestion {
                question: "What does retrieval add?".into(),
                ..Default::default()
            }],
        )
        .await
        .unwrap();
    let llm = StubCompletion::new().fail("offline");

    let planned = pipeline(store, &llm).plan_lesson(BOOK, 0).await;

    assert_eq!(planned.source, "outline-skeleton");
    let titles: Vec<&str> = planned.plan.slides.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Retrieval Basics Overview",
            "Key Takeaways 1",
            "Key Takeaways 2",
            "Quiz Preview",
        ]
    );
    assert_eq!(planned.plan.slides[3].bullets[0], "Q1: What does retrieval add?");
    assert!(planned.plan.slides.iter().all(|s| s.has_narration()));
    assert!(planned.plan.slides.iter().all(|s| s.code_snippet.is_none()));
    assert_eq!(planned.plan.total_duration_sec, 140);
}

#[tokio::test]
async fn no_outline_yields_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let store = BookStore::new(dir.path());
    let llm = StubCompletion::new();

    let planned = pipeline(store, &llm).plan_lesson("unknown", 3).await;

    assert_eq!(planned.source, "placeholder");
    assert_eq!(planned.plan.lesson_id, "unknown-lesson-3");
    assert_eq!(planned.plan.slides.len(), 2);
    assert_eq!(
        planned.plan.slides[0].narration,
        "Introduction Set expectations for the lesson Highlight key takeaways"
    );
    assert_eq!(planned.plan.total_duration_sec, 90);
}

#[tokio::test]
async fn lesson_outside_the_outline_yields_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let llm = StubCompletion::new();

    let planned = pipeline(store, &llm).plan_lesson(BOOK, 9).await;
    assert_eq!(planned.source, "placeholder");
}

#[tokio::test]
async fn produced_lesson_writes_props_and_renders() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store.save_script(BOOK, "lesson_1", RAG_SCRIPT).await.unwrap();
    let avatar = store.avatar_path(BOOK, 0);
    std::fs::create_dir_all(avatar.parent().unwrap()).unwrap();
    std::fs::write(&avatar, b"avatar").unwrap();

    let llm = StubCompletion::new();
    let renderer = StubRenderer::default();
    let public_dir = dir.path().join("public");
    let stack = MediaStack {
        tts: Box::new(StubSpeech::default()),
        media: Box::new(WavTool),
        renderer: Box::new(renderer.clone()),
        public_dir: public_dir.clone(),
    };

    let rendered = pipeline(store, &llm)
        .produce_lesson_video(BOOK, 0, &stack)
        .await
        .unwrap();

    assert_eq!(rendered.source, "existing-script");
    assert!(rendered.video_path.exists());
    assert_eq!(
        renderer.rendered(),
        vec![("lesson_1".to_string(), rendered.props_path.clone())]
    );

    let props: RenderProps =
        serde_json::from_str(&std::fs::read_to_string(&rendered.props_path).unwrap()).unwrap();
    assert_eq!(props.audio_src, "/generated/book-1/lesson_1_audio.wav");
    assert_eq!(
        props.avatar_src.as_deref(),
        Some("/generated/book-1/lesson_0_avatar.mp4")
    );
    assert!(public_dir.join("generated/book-1/lesson_1_audio.wav").exists());

    let timings = &props.plan.slide_timings;
    assert_eq!(timings.len(), props.plan.slides.len());
    assert_eq!(
        props.plan.total_duration_sec,
        timings.last().unwrap().end_sec.ceil() as u32
    );
}

#[tokio::test]
async fn audio_failures_name_their_stage() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store.save_script(BOOK, "lesson_1", RAG_SCRIPT).await.unwrap();
    let llm = StubCompletion::new();
    let stack = MediaStack {
        tts: Box::new(StubSpeech::failing()),
        media: Box::new(WavTool),
        renderer: Box::new(StubRenderer::default()),
        public_dir: dir.path().join("public"),
    };

    let err = pipeline(store, &llm)
        .produce_lesson_video(BOOK, 0, &stack)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Audio));
    assert!(err.to_string().starts_with("audio stage failed"));
}

#[tokio::test]
async fn script_requires_an_outline() {
    let dir = tempfile::tempdir().unwrap();
    let llm = StubCompletion::new();

    let err = pipeline(BookStore::new(dir.path()), &llm)
        .write_script(BOOK, 0, None, false)
        .await
        .unwrap_err();

    match err {
        BookcastError::StageFailed { stage, source } => {
            assert_eq!(stage, Stage::Script);
            assert!(matches!(*source, BookcastError::MissingOutline { .. }));
        }
        other => panic!("expected a stage failure, got {other:?}"),
    }
}

#[tokio::test]
async fn existing_scripts_are_reused_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    store.save_script(BOOK, "lesson_1", "Old script.").await.unwrap();
    let llm = StubCompletion::always("Fresh script.");
    let pipeline = pipeline(store, &llm);

    let reused = pipeline.write_script(BOOK, 0, None, false).await.unwrap();
    assert!(reused.reused);
    assert_eq!(reused.script, "Old script.");
    assert_eq!(llm.calls(), 0);

    let fresh = pipeline.write_script(BOOK, 0, None, true).await.unwrap();
    assert!(!fresh.reused);
    assert_eq!(fresh.script, "Fresh script.");
    assert!(!llm.user_prompt(0).contains("p3"));
}

#[tokio::test]
async fn outline_is_generated_from_book_text() {
    let dir = tempfile::tempdir().unwrap();
    let store = BookStore::new(dir.path());
    store
        .save_book_text(BOOK, "Practical RAG\nChapter 1")
        .await
        .unwrap();
    let llm = StubCompletion::new().reply(&format!("```json\n{OUTLINE_JSON}\n```"));
    let pipeline = pipeline(store, &llm);

    let outline = pipeline.create_outline(BOOK).await.unwrap();

    assert_eq!(outline.lessons.len(), 2);
    assert!(llm.user_prompt(0).contains("Book title: Practical RAG"));
    assert_eq!(
        pipeline.outline(BOOK).await.unwrap().course_title,
        "Practical RAG"
    );
}
