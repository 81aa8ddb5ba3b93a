use tracing::warn;

use crate::{
    error::Result,
    llm::{ChatMessage, TextCompletion},
    types::{LessonOutline, QuizQuestion},
};

pub fn build_quiz_messages(lesson: &LessonOutline) -> Vec<ChatMessage> {
    let mut prompt = format!(
        "Create 4 multiple-choice quiz questions for this lesson:\n\nLesson: {}\nSummary: {}\n\nKey Points:\n",
        lesson.title, lesson.summary
    );
    for point in &lesson.key_points {
        prompt.push_str(&format!("- {point}\n"));
    }
    prompt.push_str(
        r#"
For each question, provide the question text, 4 answer options (A, B, C, D),
the correct answer letter and a brief explanation.

Format as JSON:
[
  {
    "question": "Question text?",
    "options": {"A": "Option A", "B": "Option B", "C": "Option C", "D": "Option D"},
    "correct_answer": "A",
    "explanation": "Brief explanation"
  }
]

Mix conceptual and practical questions."#,
    );

    vec![
        ChatMessage::system("You create quiz questions for technical courses."),
        ChatMessage::user(prompt),
    ]
}

/// The JSON array between the first `[` and last `]`; anything unparseable is an empty quiz.
pub fn parse_quiz(raw: &str) -> Vec<QuizQuestion> {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    serde_json::from_str(&raw[start..=end]).unwrap_or_else(|e| {
        warn!(error = %e, "quiz response did not parse");
        Vec::new()
    })
}

pub async fn generate_quiz(
    llm: &dyn TextCompletion,
    lesson: &LessonOutline,
) -> Result<Vec<QuizQuestion>> {
    let raw = llm
        .complete(&build_quiz_messages(lesson), 0.5, Some(1500))
        .await?;
    Ok(parse_quiz(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_is_extracted_from_chatty_output() {
        let raw = r#"Here you go:
[{"question": "What does RAG add?", "options": {"A": "Retrieval", "B": "Latency"},
  "correct_answer": "A", "explanation": "It retrieves documents."}]
Good luck!"#;
        let quiz = parse_quiz(raw);
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].options["A"], "Retrieval");
    }

    #[test]
    fn garbage_yields_empty_quiz() {
        assert!(parse_quiz("no questions today").is_empty());
        assert!(parse_quiz("] backwards [").is_empty());
        assert!(parse_quiz("[{\"broken\": }]").is_empty());
    }
}
