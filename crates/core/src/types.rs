use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseOutline {
    #[serde(default)]
    pub course_title: String,
    #[serde(default)]
    pub target_audience: String,
    #[serde(default)]
    pub lessons: Vec<LessonOutline>,
}

impl CourseOutline {
    /// Lesson at `index` together with its id, falling back to `lesson_{n}` when the
    /// model left the id blank.
    pub fn lesson(&self, index: usize) -> Option<(String, &LessonOutline)> {
        let lesson = self.lessons.get(index)?;
        Some((lesson.id_or_default(index), lesson))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonOutline {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl LessonOutline {
    pub fn id_or_default(&self, index: usize) -> String {
        if self.id.trim().is_empty() {
            format!("lesson_{}", index + 1)
        } else {
            self.id.clone()
        }
    }

    pub fn title_or_default(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            format!("Lesson {}", index + 1)
        } else {
            self.title.clone()
        }
    }
}

/// One displayed unit of a lesson video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub narration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_hint: Option<String>,
}

impl Slide {
    pub fn new(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            title: title.into(),
            bullets,
            ..Default::default()
        }
    }

    pub fn has_narration(&self) -> bool {
        !self.narration.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideTiming {
    pub slide_index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonVideoPlan {
    pub lesson_id: String,
    pub title: String,
    pub slides: Vec<Slide>,
    pub total_duration_sec: u32,
    #[serde(default)]
    pub slide_timings: Vec<SlideTiming>,
}

/// Metadata for one image extracted from the source book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_decorative: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}
