//! Hand-authored lesson content documents.
//!
//! When a `{book}_{lesson}_content.json` document exists its slides are used as-is,
//! ahead of any script segmentation.

use serde::{Deserialize, Serialize};

use crate::types::{LessonVideoPlan, Slide};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonContent {
    pub lesson_id: String,
    pub title: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<LearningObjective>,
    #[serde(default)]
    pub sections: Vec<SectionContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningObjective {
    pub text: String,
    #[serde(default)]
    pub bloom_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionContent {
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub slides: Vec<SlideContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideContent {
    pub headline: String,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default)]
    pub visual_description: Option<String>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub narration: Option<String>,
}

impl From<&SlideContent> for Slide {
    fn from(content: &SlideContent) -> Self {
        Slide {
            title: content.headline.clone(),
            bullets: content.bullet_points.clone(),
            code_snippet: content.code_snippet.clone(),
            narration: content.narration.clone().unwrap_or_default(),
            image_path: None,
            visual_hint: content.visual_description.clone(),
        }
    }
}

impl LessonContent {
    pub fn to_plan(&self) -> LessonVideoPlan {
        let mut slides: Vec<Slide> = self
            .sections
            .iter()
            .flat_map(|section| section.slides.iter().map(Slide::from))
            .collect();

        if slides.is_empty() {
            slides.push(Slide::new(
                self.title.clone(),
                vec!["Lesson content available but no slides defined.".to_string()],
            ));
        }

        let total_duration_sec = self
            .estimated_minutes
            .filter(|m| *m > 0)
            .map(|m| m * 60)
            .unwrap_or(90)
            .max(60);

        LessonVideoPlan {
            lesson_id: self.lesson_id.clone(),
            title: self.title.clone(),
            slides,
            total_duration_sec,
            slide_timings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slides_are_taken_verbatim_in_section_order() {
        let content: LessonContent = serde_json::from_str(
            r#"{
                "lesson_id": "lesson_2",
                "title": "Vector Search",
                "estimated_minutes": 4,
                "sections": [
                    {"section_id": "s1", "title": "Intro", "explanation": "",
                     "slides": [{"headline": "Why vectors", "bullet_points": ["Dense meaning"],
                                 "narration": "Vectors capture meaning.",
                                 "visual_description": "scatter plot"}]},
                    {"section_id": "s2", "title": "Code", "explanation": "",
                     "slides": [{"headline": "Cosine in code", "code_snippet": "dot(a, b)"}]}
                ]
            }"#,
        )
        .unwrap();

        let plan = content.to_plan();
        assert_eq!(plan.slides.len(), 2);
        assert_eq!(plan.slides[0].narration, "Vectors capture meaning.");
        assert_eq!(plan.slides[0].visual_hint.as_deref(), Some("scatter plot"));
        assert_eq!(plan.slides[1].code_snippet.as_deref(), Some("dot(a, b)"));
        assert!(plan.slides[1].narration.is_empty());
        assert_eq!(plan.total_duration_sec, 240);
    }

    #[test]
    fn empty_content_still_yields_one_slide() {
        let content = LessonContent {
            lesson_id: "lesson_1".into(),
            title: "Empty".into(),
            ..Default::default()
        };
        let plan = content.to_plan();
        assert_eq!(plan.slides.len(), 1);
        assert_eq!(plan.total_duration_sec, 90);
    }
}
