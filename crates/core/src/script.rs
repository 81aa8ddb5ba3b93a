//! Lesson narration scripts.

use tracing::info;

use crate::{
    config::ScriptMode,
    error::Result,
    llm::{ChatMessage, TextCompletion},
    text::{strip_stage_directions, truncate_chars, word_count},
    types::LessonOutline,
};

/// Book context characters included in a `prod` script prompt.
pub const SCRIPT_CONTEXT_BUDGET: usize = 2_000;

static SCRIPT_SYSTEM_PROMPT_TEST: &str = r#"You are an expert video course script writer for technical education.

Your task is to convert a lesson outline into an engaging, SHORT conversational video script
suitable for an AI avatar instructor (Udemy/Pluralsight style).

This is a TEST/DEMO version - keep it SHORT!

Guidelines:
1. Write in a friendly, conversational tone (like you're teaching a friend)
2. Use short, clear sentences (easier for speech synthesis)
3. Structure the script as: a quick hook (10-15 seconds), ONE key concept (60-90 seconds), a brief summary (10-15 seconds)
4. Include natural transitions between ideas
5. KEEP TOTAL SCRIPT LENGTH TO 1-2 MINUTES of speaking time (~200-400 words MAX)
6. Avoid special characters that might break text-to-speech
7. Focus on THE MOST IMPORTANT concept only - skip secondary details

Output only the script text, nothing else."#;

static SCRIPT_SYSTEM_PROMPT_PROD: &str = r#"You are an expert video course script writer for technical education.

Your task is to convert a lesson outline into an engaging, conversational video script
suitable for an AI avatar instructor (Udemy/Pluralsight style).

Guidelines:
1. Write in a friendly, conversational tone (like you're teaching a friend)
2. Use short, clear sentences (easier for speech synthesis)
3. Structure the script as: a hook (15-30 seconds), main content with explanations (5-7 minutes), summary and next steps (30-45 seconds)
4. Include natural transitions between topics
5. Keep total script length to 6-8 minutes of speaking time (~1200-1600 words)
6. Avoid special characters that might break text-to-speech

Output only the script text, nothing else."#;

struct ModeProfile {
    system_prompt: &'static str,
    max_tokens: u32,
    key_point_limit: Option<usize>,
    time_guidance: &'static str,
    detail_level: &'static str,
}

impl ModeProfile {
    fn of(mode: ScriptMode) -> Self {
        match mode {
            ScriptMode::Test => ModeProfile {
                system_prompt: SCRIPT_SYSTEM_PROMPT_TEST,
                max_tokens: 600,
                key_point_limit: Some(2),
                time_guidance: "1-2 minutes of speaking time (~200-400 words MAX)",
                detail_level: "Focus on ONE main concept only - skip examples and details",
            },
            ScriptMode::Prod => ModeProfile {
                system_prompt: SCRIPT_SYSTEM_PROMPT_PROD,
                max_tokens: 2500,
                key_point_limit: None,
                time_guidance: "6-8 minutes of speaking time (~1200-1600 words)",
                detail_level: "Cover all key points with examples and explanations",
            },
        }
    }
}

pub struct ScriptRequest<'a> {
    pub lesson: &'a LessonOutline,
    pub book_context: Option<&'a str>,
    pub course_title: Option<&'a str>,
    pub mode: ScriptMode,
}

/// Messages plus the token cap for one script request.
pub fn build_script_messages(request: &ScriptRequest<'_>) -> (Vec<ChatMessage>, u32) {
    let profile = ModeProfile::of(request.mode);
    let course = request
        .course_title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Technical Programming Course");

    let mut prompt = format!(
        "Create a video script for this lesson:\n\nCourse: {course}\nLesson Title: {}\nSummary: {}\n\nKey Points to Cover:\n",
        request.lesson.title, request.lesson.summary
    );

    let key_points = &request.lesson.key_points;
    let key_points = match profile.key_point_limit {
        Some(limit) => &key_points[..key_points.len().min(limit)],
        None => &key_points[..],
    };
    for (i, point) in key_points.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, point));
    }

    if request.mode == ScriptMode::Prod {
        if let Some(context) = request.book_context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str("\n\nBook Context (for reference):\n");
            prompt.push_str(truncate_chars(context, SCRIPT_CONTEXT_BUDGET));
        }
    }

    let (mode_label, hook, ending) = match request.mode {
        ScriptMode::Test => ("TEST/DEMO (SHORT)", "a quick hook", "brief"),
        ScriptMode::Prod => ("PRODUCTION (FULL)", "an engaging hook", "clear"),
    };
    prompt.push_str(&format!(
        r#"

MODE: {mode_label}

CRITICAL: Write NATURAL conversational speech ONLY.
DO NOT include [SHOW_CODE], [PAUSE], [SHOW_DIAGRAM] or ANY bracketed markers in the script.
The instructor should speak like a real teacher, not read stage directions.

Remember:
- Start with {hook}
- Speak naturally and conversationally
- When discussing code, just say "here's an example" or "let's look at this"
- End with a {ending} summary
- Keep it {}
- {}

GOOD example: "Variables store data. For example, we can write name equals Alice, or age equals 25."
BAD example: "Variables store data. [SHOW_CODE] See this code. [PAUSE]"
"#,
        profile.time_guidance, profile.detail_level
    ));

    (
        vec![
            ChatMessage::system(profile.system_prompt),
            ChatMessage::user(prompt),
        ],
        profile.max_tokens,
    )
}

/// Generate narration for one lesson. Completion failures propagate unchanged.
pub async fn generate_lesson_script(
    llm: &dyn TextCompletion,
    request: &ScriptRequest<'_>,
) -> Result<String> {
    let (messages, max_tokens) = build_script_messages(request);
    let raw = llm.complete(&messages, 0.7, Some(max_tokens)).await?;
    let script = strip_stage_directions(&raw);
    info!(
        mode = %request.mode,
        chars = script.len(),
        words = word_count(&script),
        "generated lesson script"
    );
    Ok(script)
}
