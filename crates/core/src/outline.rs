use tracing::{info, warn};

use crate::{
    error::{BookcastError, Result},
    llm::{ChatMessage, TextCompletion},
    text::truncate_chars,
    types::CourseOutline,
};

/// Characters of book text sent with the outline request.
pub const OUTLINE_TEXT_BUDGET: usize = 20_000;

static OUTLINE_SYSTEM_PROMPT: &str = r#"You are an expert course designer for technical topics.

Given the text of a technical book, design a 10-15 lesson video course
(Udemy/Pluralsight style) for beginner-to-intermediate learners.

Each lesson should have:
- id: a simple string like "lesson_1"
- title: clear, engaging
- summary: 2-4 sentences
- key_points: 3-6 bullet points

Respond with STRICT JSON with this exact structure:

{
  "course_title": "string",
  "target_audience": "string",
  "lessons": [
    {
      "id": "lesson_1",
      "title": "string",
      "summary": "string",
      "key_points": ["string", "..."]
    }
  ]
}

Do not include any extra text, comments, or markdown.
Just pure JSON."#;

/// Crude title guess: the first non-empty line of the extracted text.
pub fn guess_title(book_text: &str) -> Option<&str> {
    book_text.lines().map(str::trim).find(|l| !l.is_empty())
}

pub fn build_outline_messages(book_text: &str, title_hint: Option<&str>) -> Vec<ChatMessage> {
    let mut user_prompt = String::from("Here is the book content.\n");
    if let Some(title) = title_hint {
        user_prompt.push_str(&format!("Book title: {title}\n\n"));
    }
    user_prompt.push_str("Book text (truncated):\n");
    user_prompt.push_str(truncate_chars(book_text, OUTLINE_TEXT_BUDGET));

    vec![
        ChatMessage::system(OUTLINE_SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ]
}

/// Generate a course outline with one completion call.
pub async fn generate_course_outline(
    llm: &dyn TextCompletion,
    book_text: &str,
    title_hint: Option<&str>,
) -> Result<CourseOutline> {
    let messages = build_outline_messages(book_text, title_hint);
    let raw = llm.complete(&messages, 0.4, None).await?;
    let outline = parse_outline(&raw)?;
    info!(lessons = outline.lessons.len(), "outline generated");
    Ok(outline)
}

/// Parse model output as an outline. When the output is not clean JSON, the span
/// between the first `{` and the last `}` gets exactly one more attempt.
pub fn parse_outline(raw: &str) -> Result<CourseOutline> {
    let first_error = match serde_json::from_str::<CourseOutline>(raw) {
        Ok(outline) => return Ok(outline),
        Err(e) => e,
    };

    let span = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => {
            return Err(BookcastError::MalformedOutline {
                reason: first_error.to_string(),
                raw: raw.to_string(),
            });
        }
    };

    warn!("outline response was not clean JSON, retrying on the braced span");
    serde_json::from_str(span).map_err(|e| BookcastError::MalformedOutline {
        reason: e.to_string(),
        raw: raw.to_string(),
    })
}
