use crate::types::{CourseOutline, LessonVideoPlan, QuizQuestion};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

pub fn format_outline_readable(outline: &CourseOutline) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", outline.course_title));
    if !outline.target_audience.is_empty() {
        output.push_str(&format!("**Audience:** {}\n\n", outline.target_audience));
    }

    for (idx, lesson) in outline.lessons.iter().enumerate() {
        output.push_str(&format!(
            "## {}. {} ({})\n\n",
            idx,
            lesson.title_or_default(idx),
            lesson.id_or_default(idx)
        ));
        if !lesson.summary.is_empty() {
            output.push_str(&format!("{}\n\n", lesson.summary));
        }
        for point in &lesson.key_points {
            output.push_str(&format!("• {}\n", point));
        }
        output.push('\n');
    }

    output
}

/// Slides with their timing windows when audio has been built, otherwise in order.
pub fn format_plan_readable(plan: &LessonVideoPlan) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", plan.title));
    output.push_str(&format!(
        "**Lesson:** {} | **Slides:** {} | **Duration:** {}\n\n",
        plan.lesson_id,
        plan.slides.len(),
        format_timestamp(plan.total_duration_sec as f64)
    ));

    for (idx, slide) in plan.slides.iter().enumerate() {
        match plan.slide_timings.get(idx) {
            Some(t) => output.push_str(&format!(
                "## [{}–{}] {}\n\n",
                format_timestamp(t.start_sec),
                format_timestamp(t.end_sec),
                slide.title
            )),
            None => output.push_str(&format!("## {}. {}\n\n", idx + 1, slide.title)),
        }

        for bullet in &slide.bullets {
            output.push_str(&format!("• {}\n", bullet));
        }
        if let Some(image) = &slide.image_path {
            output.push_str(&format!("\n🖼  {}\n", image));
        }
        if let Some(code) = &slide.code_snippet {
            output.push_str(&format!("\n```\n{}\n```\n", code.trim_end()));
        }
        if slide.has_narration() {
            output.push_str(&format!("\n> {}\n", slide.narration.trim()));
        }
        output.push('\n');
    }

    output
}

pub fn format_quiz_readable(quiz: &[QuizQuestion]) -> String {
    let mut output = String::new();
    for (idx, question) in quiz.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", idx + 1, question.question));
        for (letter, option) in &question.options {
            let marker = if *letter == question.correct_answer { "*" } else { " " };
            output.push_str(&format!("  {}{}) {}\n", marker, letter, option));
        }
        if !question.explanation.is_empty() {
            output.push_str(&format!("  → {}\n", question.explanation));
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Slide, SlideTiming};

    #[test]
    fn timestamps_are_zero_padded() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.9), "01:15");
    }

    #[test]
    fn timed_plans_show_windows() {
        let plan = LessonVideoPlan {
            lesson_id: "lesson_1".into(),
            title: "Intro".into(),
            slides: vec![Slide::new("Hello", vec!["World".into()])],
            total_duration_sec: 12,
            slide_timings: vec![SlideTiming {
                slide_index: 0,
                start_sec: 0.0,
                end_sec: 11.4,
            }],
        };
        let text = format_plan_readable(&plan);
        assert!(text.contains("## [00:00–00:11] Hello"));
        assert!(text.contains("• World"));
    }
}
