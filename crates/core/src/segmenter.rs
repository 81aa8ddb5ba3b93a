//! Splits a narration script into slide-sized units.
//!
//! Sentences are partitioned into 4-6 contiguous chunks. Each chunk becomes one slide:
//! the chunk text is the slide's narration, and a short headline plus a few noun-phrase
//! bullets are derived from it for display, by the LLM when available and by keyword
//! heuristics otherwise.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    llm::{ChatMessage, TextCompletion},
    text::{capitalize_first, truncate_words, word_count},
    types::{LessonVideoPlan, Slide},
};

pub const MIN_SLIDES: usize = 4;
pub const MAX_SLIDES: usize = 6;
pub const MAX_BULLETS: usize = 5;
pub const MAX_BULLET_WORDS: usize = 10;
pub const MAX_HEADLINE_WORDS: usize = 6;

const SLIDE_LABELS: [&str; 6] = [
    "Introduction",
    "Core Concepts",
    "Deep Dive",
    "Key Insights",
    "Application",
    "Summary",
];

/// Split on sentence-terminal punctuation followed by whitespace.
pub fn split_sentences(script: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = script.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                let sentence = script[start..next_idx].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = next_idx;
            }
        }
    }

    let tail = script[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Roughly one slide per four sentences, clamped to `[MIN_SLIDES, MAX_SLIDES]`.
pub fn target_slide_count(sentence_count: usize) -> usize {
    (sentence_count / 4).clamp(MIN_SLIDES, MAX_SLIDES)
}

/// Contiguous chunks with proportional boundaries `round(i * n / parts)`, so remainders
/// spread across chunks. Empty chunks are dropped.
pub fn partition<T: Clone>(items: &[T], parts: usize) -> Vec<Vec<T>> {
    if parts == 0 {
        return Vec::new();
    }
    let n = items.len();
    let boundary = |i: usize| (2 * i * n + parts) / (2 * parts);
    (0..parts)
        .map(|i| items[boundary(i)..boundary(i + 1)].to_vec())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

static CODE_HINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(functions?|examples?|code|snippets?|methods?|class(es)?|implement\w*|syntax|variables?|loops?|returns?)\b",
        r"[{};]|=>|::|==",
        r"\b[A-Za-z_][A-Za-z0-9_]*\(\)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

pub fn mentions_code(text: &str) -> bool {
    CODE_HINTS.iter().any(|re| re.is_match(text))
}

/// Slide that receives the snippet: first chunk that talks about code, otherwise index 2,
/// or the last body slide when there are fewer than three.
pub fn code_slot(chunks: &[String]) -> Option<usize> {
    if chunks.is_empty() {
        return None;
    }
    chunks
        .iter()
        .position(|chunk| mentions_code(chunk))
        .or(Some(2.min(chunks.len() - 1)))
}

/// Headline and bullets for one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideSummary {
    pub headline: String,
    pub bullets: Vec<String>,
}

static SUMMARY_SYSTEM_PROMPT: &str = r#"You turn lecture narration into slide text.
Reply in exactly this format and nothing else:

HEADLINE: <3-6 word headline>
BULLETS:
- <short noun phrase, 3-7 words>
- <short noun phrase, 3-7 words>
- <short noun phrase, 3-7 words>

Give 3 to 5 bullets. Bullets are compressed phrases, never full sentences."#;

pub fn build_summary_messages(chunk_text: &str, lesson_title: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Lesson: {lesson_title}\n\nNarration for this slide:\n{chunk_text}"
        )),
    ]
}

/// Parse a `HEADLINE:` / `BULLETS:` block. `None` when either part is missing.
pub fn parse_summary_block(raw: &str) -> Option<SlideSummary> {
    let headline_at = raw.find("HEADLINE:")?;
    let bullets_at = raw.find("BULLETS:")?;

    let headline_end = if bullets_at > headline_at {
        bullets_at
    } else {
        raw.len()
    };
    let headline = raw[headline_at + "HEADLINE:".len()..headline_end]
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?
        .trim_matches(|c: char| c == '"' || c == '*')
        .trim()
        .to_string();
    if headline.is_empty() {
        return None;
    }

    let bullets: Vec<String> = raw[bullets_at + "BULLETS:".len()..]
        .lines()
        .map(str::trim)
        .take_while(|l| !l.starts_with("HEADLINE:"))
        .filter_map(strip_list_marker)
        .map(|b| b.trim_end_matches(['.', ';']).trim().to_string())
        .filter(|b| !b.is_empty())
        .collect();
    if bullets.is_empty() {
        return None;
    }

    Some(SlideSummary { headline, bullets })
}

fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return Some(rest);
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        return rest
            .strip_prefix(". ")
            .or_else(|| rest.strip_prefix(") "));
    }
    None
}

static TECH_TERMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // acronyms: RAG, LLM, APIs
        r"\b[A-Z]{2,}s?\b",
        // CamelCase identifiers
        r"\b[A-Z][a-z]+[A-Z][A-Za-z]+\b",
        // snake_case identifiers
        r"\b[a-z]+_[a-z0-9_]+\b",
        // modifier + technical noun
        r"(?i)\b(?:[a-z]+[- ])?(?:model|vector|embedding|database|index|pipeline|prompt|query|retrieval|retriever|token|chunk|cache|layer|function|api|similarity|context)s?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static GERUND_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,}ing)\s+((?:[a-z0-9-]+\s+){0,3}[a-z0-9-]+)").expect("valid regex")
});

static LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:so|now|and|but|then|also|well|okay|ok|alright|first|next|finally|basically|remember|here|in short|in this lesson|today),?\s+)*(?:(?:it|this|that|these|those|they|we|you|i|there)(?:'ll|'re|'s|'ve)?\s+)?(?:(?:is|are|was|were|can|will|should|must|just|also|really|then|simply)\s+)*",
    )
    .expect("valid regex")
});

static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(hey|hi|hello|welcome|let'?s|today|now|so|okay|alright|in this|we'?ll|we'?re going)\b")
        .expect("valid regex")
});

const TRAILING_STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "into", "on", "for", "with", "by", "from",
    "at", "as", "is", "are", "that", "this", "it", "its", "your", "our", "their",
];

/// Compress a sentence into a short display phrase: leading filler and pronoun subjects
/// are dropped, the remainder is capped at `max_words` and trailing stopwords removed.
pub fn compress_phrase(sentence: &str, max_words: usize) -> String {
    let cleaned = sentence.trim().trim_end_matches(['.', '!', '?', ',', ';', ':']);
    let stripped = LEADING_FILLER.replace(cleaned, "");
    let source = if stripped.trim().is_empty() {
        cleaned
    } else {
        stripped.trim()
    };

    let mut words: Vec<&str> = source.split_whitespace().take(max_words).collect();
    while words.len() > 1 {
        let last = words[words.len() - 1]
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_ascii_lowercase();
        if TRAILING_STOPWORDS.contains(&last.as_str()) {
            words.pop();
        } else {
            break;
        }
    }
    let phrase = words
        .join(" ")
        .trim_end_matches([',', ';', ':', '-'])
        .to_string();
    capitalize_first(&phrase)
}

fn technical_terms(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for re in TECH_TERMS.iter() {
        for m in re.find_iter(text) {
            terms.push(m.as_str().trim().to_string());
        }
    }
    terms
}

fn gerund_phrase(sentence: &str) -> Option<String> {
    let captures = GERUND_PHRASE.captures(sentence)?;
    let phrase = compress_phrase(captures.get(0)?.as_str(), 6);
    (word_count(&phrase) >= 2).then_some(phrase)
}

/// Keyword fallback: one phrase per sentence (gerund phrase when present, otherwise the
/// compressed sentence), topped up with technical terms, deduplicated case-insensitively.
pub fn keyword_summary(sentences: &[String], label: &str) -> SlideSummary {
    let mut seen = HashSet::new();
    let mut bullets = Vec::new();
    let mut push = |candidate: String, bullets: &mut Vec<String>| {
        let candidate = truncate_words(&candidate, MAX_BULLET_WORDS);
        if candidate.is_empty() || bullets.len() >= MAX_BULLETS {
            return;
        }
        if seen.insert(candidate.to_lowercase()) {
            bullets.push(candidate);
        }
    };

    for sentence in sentences {
        let phrase = gerund_phrase(sentence).unwrap_or_else(|| compress_phrase(sentence, 7));
        push(phrase, &mut bullets);
    }
    if bullets.len() < 3 {
        for term in technical_terms(&sentences.join(" ")) {
            push(capitalize_first(&term), &mut bullets);
        }
    }

    let headline_source = match sentences {
        [first, second, ..] if GREETING.is_match(first) => second.as_str(),
        [first, ..] => first.as_str(),
        [] => "",
    };
    let mut headline = compress_phrase(headline_source, MAX_HEADLINE_WORDS);
    if headline.is_empty() {
        headline = label.to_string();
    }

    SlideSummary { headline, bullets }
}

const MIN_BULLETS: usize = 3;

/// Pad a summary with fewer than three bullets from `fallback`, skipping duplicates.
fn top_up_bullets(mut summary: SlideSummary, fallback: SlideSummary) -> SlideSummary {
    let mut seen: HashSet<String> = summary.bullets.iter().map(|b| b.to_lowercase()).collect();
    for bullet in fallback.bullets {
        if summary.bullets.len() >= MIN_BULLETS {
            break;
        }
        if seen.insert(bullet.to_lowercase()) {
            summary.bullets.push(bullet);
        }
    }
    summary
}

fn enforce_limits(mut summary: SlideSummary, label: &str) -> SlideSummary {
    summary.headline = truncate_words(&summary.headline, MAX_HEADLINE_WORDS);
    if summary.headline.is_empty() {
        summary.headline = label.to_string();
    }
    summary.bullets = summary
        .bullets
        .iter()
        .map(|b| truncate_words(b, MAX_BULLET_WORDS))
        .filter(|b| !b.is_empty())
        .take(MAX_BULLETS)
        .collect();
    summary
}

pub struct SlideSegmenter<'a> {
    llm: Option<&'a dyn TextCompletion>,
}

impl<'a> SlideSegmenter<'a> {
    /// Segmenter that asks `llm` for headlines and bullets, falling back to keywords.
    pub fn new(llm: Option<&'a dyn TextCompletion>) -> Self {
        Self { llm }
    }

    /// Segmenter that only uses the keyword heuristics.
    pub fn heuristic() -> Self {
        Self { llm: None }
    }

    pub async fn segment(
        &self,
        script: &str,
        lesson_title: &str,
        code_snippet: Option<&str>,
    ) -> Vec<Slide> {
        let mut sentences = split_sentences(script);
        if sentences.is_empty() {
            sentences.push(script.trim().to_string());
        }

        let chunks: Vec<Vec<String>> = partition(&sentences, target_slide_count(sentences.len()))
            .into_iter()
            .filter(|chunk| chunk.iter().any(|s| !s.is_empty()))
            .collect();

        if chunks.is_empty() {
            return vec![Slide {
                title: lesson_title.to_string(),
                code_snippet: code_snippet.map(str::to_string),
                ..Default::default()
            }];
        }

        let narrations: Vec<String> = chunks.iter().map(|c| c.join(" ")).collect();
        let code_index = code_snippet.and_then(|_| code_slot(&narrations));

        let mut slides = Vec::with_capacity(chunks.len());
        for (idx, (chunk, narration)) in chunks.iter().zip(&narrations).enumerate() {
            let label = SLIDE_LABELS
                .get(idx)
                .map(|l| l.to_string())
                .unwrap_or_else(|| format!("Part {}", idx + 1));
            let summary = self.summarize(chunk, narration, lesson_title, &label).await;

            slides.push(Slide {
                title: summary.headline,
                bullets: summary.bullets,
                code_snippet: if code_index == Some(idx) {
                    code_snippet.map(str::to_string)
                } else {
                    None
                },
                narration: narration.clone(),
                image_path: None,
                visual_hint: None,
            });
        }
        slides
    }

    async fn summarize(
        &self,
        sentences: &[String],
        narration: &str,
        lesson_title: &str,
        label: &str,
    ) -> SlideSummary {
        if let Some(llm) = self.llm {
            let messages = build_summary_messages(narration, lesson_title);
            match llm.complete(&messages, 0.3, Some(200)).await {
                Ok(raw) => match parse_summary_block(&raw) {
                    Some(summary) => {
                        let summary = top_up_bullets(summary, keyword_summary(sentences, label));
                        return enforce_limits(summary, label);
                    }
                    None => debug!("slide summary block missing HEADLINE/BULLETS, using keywords"),
                },
                Err(e) => warn!(error = %e, "slide summary call failed, using keywords"),
            }
        }
        enforce_limits(keyword_summary(sentences, label), label)
    }
}

/// Provisional duration before audio exists: ~2.5 words per second plus padding.
pub fn estimate_duration_from_text(text: &str) -> u32 {
    let words = word_count(text) as u32;
    ((words * 2).div_ceil(5) + 5).max(60)
}

/// Segment a script into a complete (not yet timed) plan.
pub async fn plan_from_script(
    segmenter: &SlideSegmenter<'_>,
    lesson_id: &str,
    title: &str,
    script: &str,
    code_snippet: Option<&str>,
) -> LessonVideoPlan {
    LessonVideoPlan {
        lesson_id: lesson_id.to_string(),
        title: title.to_string(),
        slides: segmenter.segment(script, title, code_snippet).await,
        total_duration_sec: estimate_duration_from_text(script),
        slide_timings: Vec::new(),
    }
}
