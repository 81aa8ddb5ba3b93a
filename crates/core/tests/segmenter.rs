mod common;

use std::collections::HashSet;

use bookcast_core::{
    SlideSegmenter,
    segmenter::{MAX_BULLET_WORDS, MAX_BULLETS, MAX_HEADLINE_WORDS, split_sentences},
};
use common::{RAG_SCRIPT, StubCompletion};

const LONG_SCRIPT: &str = "Welcome to the lesson on retrieval. Today we look at how search works. \
First we split documents into chunks. Each chunk is embedded as a vector. \
Vectors live in an index. The index supports similarity search. \
Here is an example function that ranks results. It computes cosine similarity. \
Then we pick the top results. They become context for the prompt. \
The model answers using that context. This reduces hallucinations. \
We also cache embeddings. Caching keeps latency low. \
Evaluation checks answer quality. Faithfulness matters most. \
Relevance matters too. Finally we monitor the pipeline. \
Dashboards show drift. Alerts catch failures. \
That wraps up retrieval. Next time we cover reranking.";

fn narrated_sentences(slides: &[bookcast_core::Slide]) -> Vec<String> {
    slides
        .iter()
        .flat_map(|s| split_sentences(&s.narration))
        .collect()
}

#[tokio::test]
async fn four_sentence_script_yields_four_single_sentence_slides() {
    let slides = SlideSegmenter::heuristic()
        .segment(RAG_SCRIPT, "What is RAG", None)
        .await;

    assert_eq!(slides.len(), 4);
    for slide in &slides {
        assert_eq!(split_sentences(&slide.narration).len(), 1);
    }
    let distinct: HashSet<&str> = slides.iter().map(|s| s.narration.as_str()).collect();
    assert_eq!(distinct.len(), 4);
    assert_eq!(slides[0].narration, "RAG retrieves documents.");
}

#[tokio::test]
async fn narrations_partition_the_script_in_order() {
    for script in [RAG_SCRIPT, LONG_SCRIPT, "One lonely sentence."] {
        let slides = SlideSegmenter::heuristic()
            .segment(script, "Retrieval", None)
            .await;
        assert!((1..=6).contains(&slides.len()));
        assert_eq!(narrated_sentences(&slides), split_sentences(script));
    }
}

#[tokio::test]
async fn long_scripts_are_capped_at_six_slides() {
    let script = [LONG_SCRIPT; 3].join(" ");
    let slides = SlideSegmenter::heuristic()
        .segment(&script, "Retrieval", None)
        .await;
    assert_eq!(slides.len(), 6);
    assert_eq!(narrated_sentences(&slides), split_sentences(&script));
}

#[tokio::test]
async fn heuristic_bullets_respect_caps() {
    let slides = SlideSegmenter::heuristic()
        .segment(LONG_SCRIPT, "Retrieval", None)
        .await;
    for slide in &slides {
        assert!(slide.bullets.len() <= MAX_BULLETS);
        assert!(!slide.bullets.is_empty());
        for bullet in &slide.bullets {
            assert!(bullet.split_whitespace().count() <= MAX_BULLET_WORDS, "{bullet}");
        }
        assert!(slide.title.split_whitespace().count() <= MAX_HEADLINE_WORDS);
        assert!(!slide.narration.is_empty());
    }
}

#[tokio::test]
async fn llm_block_supplies_headlines_and_is_capped() {
    let llm = StubCompletion::always(
        "HEADLINE: A Very Long Headline That Keeps Going On\nBULLETS:\n\
         - one two three four five six seven eight nine ten eleven twelve\n\
         - second bullet\n- third bullet\n- fourth bullet\n- fifth bullet\n- sixth bullet",
    );
    let slides = SlideSegmenter::new(Some(&llm))
        .segment(RAG_SCRIPT, "What is RAG", None)
        .await;

    assert_eq!(llm.calls(), 4);
    assert!(llm.user_prompt(0).contains("RAG retrieves documents."));
    for slide in &slides {
        assert_eq!(slide.title, "A Very Long Headline That Keeps");
        assert_eq!(slide.bullets.len(), MAX_BULLETS);
        assert_eq!(slide.bullets[0].split_whitespace().count(), MAX_BULLET_WORDS);
    }
}

#[tokio::test]
async fn failed_or_unparseable_llm_replies_fall_back_to_keywords() {
    let llm = StubCompletion::new()
        .fail("timeout")
        .reply("I'd rather not.")
        .fail("timeout")
        .reply("HEADLINE: Grounded Answers\nBULLETS:\n- Retrieved context in prompt");
    let slides = SlideSegmenter::new(Some(&llm))
        .segment(RAG_SCRIPT, "What is RAG", None)
        .await;

    assert_eq!(slides.len(), 4);
    assert!(slides[..3].iter().all(|s| !s.bullets.is_empty()));
    assert_eq!(slides[3].title, "Grounded Answers");
    assert_eq!(slides[3].bullets[0], "Retrieved context in prompt");
    assert_eq!(slides[3].bullets[1], "Grounds the LLM response");
    assert!(slides[3].bullets.len() <= 3);
}

#[tokio::test]
async fn code_snippet_lands_on_exactly_one_slide() {
    let snippet = "def top_k(q): ...";
    for script in [RAG_SCRIPT, LONG_SCRIPT, "Just one sentence here."] {
        let slides = SlideSegmenter::heuristic()
            .segment(script, "Retrieval", Some(snippet))
            .await;
        let carriers: Vec<usize> = slides
            .iter()
            .enumerate()
            .filter(|(_, s)| s.code_snippet.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(carriers.len(), 1, "script: {script}");
    }
}

#[tokio::test]
async fn code_snippet_prefers_the_chunk_that_talks_about_code() {
    let slides = SlideSegmenter::heuristic()
        .segment(LONG_SCRIPT, "Retrieval", Some("rank(results)"))
        .await;
    let carrier = slides
        .iter()
        .find(|s| s.code_snippet.is_some())
        .unwrap();
    assert!(carrier.narration.contains("example function"));
}

#[tokio::test]
async fn blank_script_still_produces_one_slide() {
    let slides = SlideSegmenter::heuristic()
        .segment("   ", "Empty Lesson", None)
        .await;
    assert_eq!(slides.len(), 1);
    assert_eq!(slides[0].title, "Empty Lesson");
}
