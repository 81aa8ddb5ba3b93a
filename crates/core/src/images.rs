//! Assigns book images to slides with one LLM matching call.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::{
    llm::{ChatMessage, TextCompletion},
    types::{ImageRecord, Slide},
};

/// Images offered to the model in one matching call.
pub const MAX_CANDIDATES: usize = 25;

const DECORATIVE_TERMS: [&str; 3] = ["decorative", "logo", "icon"];

/// Result of one matching pass. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageMatchOutcome {
    /// Nothing to match: no slides or no usable images. No LLM call was made.
    Skipped,
    /// `(slide_index, image_id)` pairs that were applied.
    Matched { assignments: Vec<(usize, String)> },
    /// The matching call failed; slides were left untouched.
    Failed { reason: String },
}

impl ImageMatchOutcome {
    pub fn assigned(&self) -> usize {
        match self {
            ImageMatchOutcome::Matched { assignments } => assignments.len(),
            _ => 0,
        }
    }
}

fn looks_decorative(image: &ImageRecord) -> bool {
    let description = image.description.to_lowercase();
    image.is_decorative || DECORATIVE_TERMS.iter().any(|t| description.contains(t))
}

/// Images eligible for matching. Flagged or decorative-sounding images go first; if
/// that leaves nothing, only the explicit flag is honored. Flagged images are never
/// returned.
pub fn candidate_images(images: &[ImageRecord]) -> Vec<&ImageRecord> {
    let strict: Vec<&ImageRecord> = images.iter().filter(|i| !looks_decorative(i)).collect();
    if !strict.is_empty() {
        return strict;
    }
    images.iter().filter(|i| !i.is_decorative).collect()
}

/// At most `limit` items spread evenly across `items`, keeping order.
pub fn downsample<T: Copy>(items: &[T], limit: usize) -> Vec<T> {
    if items.len() <= limit {
        return items.to_vec();
    }
    (0..limit).map(|i| items[i * items.len() / limit]).collect()
}

fn slide_summary(index: usize, slide: &Slide) -> String {
    let bullets: Vec<&str> = slide.bullets.iter().take(3).map(String::as_str).collect();
    if bullets.is_empty() {
        format!("{index}: {}", slide.title)
    } else {
        format!("{index}: {} | {}", slide.title, bullets.join("; "))
    }
}

fn image_summary(image: &ImageRecord) -> String {
    let description = if image.description.trim().is_empty() {
        image.context.trim()
    } else {
        image.description.trim()
    };
    format!("{} (page {}): {}", image.id, image.page, description)
}

pub fn build_match_messages(
    slides: &[Slide],
    images: &[&ImageRecord],
    lesson_title: &str,
) -> Vec<ChatMessage> {
    let slide_lines: Vec<String> = slides
        .iter()
        .enumerate()
        .map(|(i, s)| slide_summary(i, s))
        .collect();
    let image_lines: Vec<String> = images.iter().map(|i| image_summary(i)).collect();

    let prompt = format!(
        "Lesson: {lesson_title}\n\nSlides:\n{}\n\nImages:\n{}\n\n\
Match images to slides only when the image genuinely illustrates the slide topic.\n\
Reply with one match per line as SLIDE_INDEX:IMAGE_ID.\n\
Use each image at most once and give each slide at most one image.\n\
If nothing fits, reply with NONE.",
        slide_lines.join("\n"),
        image_lines.join("\n")
    );

    vec![
        ChatMessage::system(
            "You pair figures from a technical book with lecture slides. Be selective.",
        ),
        ChatMessage::user(prompt),
    ]
}

/// Parse `SLIDE_INDEX:IMAGE_ID` lines. Separators `:`, `=`, `->` and `,` are accepted.
/// The first match per slide wins, each image is used once, and anything malformed
/// or out of range is skipped.
pub fn parse_matches(
    raw: &str,
    slide_count: usize,
    known_ids: &HashSet<&str>,
) -> Vec<(usize, String)> {
    let mut taken_slides = HashSet::new();
    let mut taken_images: HashSet<String> = HashSet::new();
    let mut matches = Vec::new();

    for line in raw.lines() {
        let line = line.trim().trim_start_matches(['-', '*']).trim();
        let Some((left, right)) = split_pair(line) else {
            continue;
        };
        let Ok(index) = left
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse::<usize>()
        else {
            continue;
        };
        let id = right
            .split(|c: char| c.is_whitespace() || c == ',')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.');

        if index >= slide_count || !known_ids.contains(id) {
            debug!(line, "ignoring image match line");
            continue;
        }
        if taken_slides.contains(&index) || taken_images.contains(id) {
            continue;
        }
        taken_slides.insert(index);
        taken_images.insert(id.to_string());
        matches.push((index, id.to_string()));
    }
    matches
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    ["->", ":", "=", ","]
        .iter()
        .find_map(|sep| line.split_once(sep))
}

pub struct ImageMatcher<'a> {
    llm: &'a dyn TextCompletion,
}

impl<'a> ImageMatcher<'a> {
    pub fn new(llm: &'a dyn TextCompletion) -> Self {
        Self { llm }
    }

    /// Set `image_path` on matched slides. Never fails the caller.
    pub async fn match_images(
        &self,
        slides: &mut [Slide],
        images: &[ImageRecord],
        lesson_title: &str,
    ) -> ImageMatchOutcome {
        if slides.is_empty() {
            return ImageMatchOutcome::Skipped;
        }
        let candidates = downsample(&candidate_images(images), MAX_CANDIDATES);
        if candidates.is_empty() {
            return ImageMatchOutcome::Skipped;
        }

        let messages = build_match_messages(slides, &candidates, lesson_title);
        let raw = match self.llm.complete(&messages, 0.2, Some(300)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "image matching failed, continuing without images");
                return ImageMatchOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let by_id: HashMap<&str, &ImageRecord> =
            candidates.iter().map(|i| (i.id.as_str(), *i)).collect();
        let known: HashSet<&str> = by_id.keys().copied().collect();
        let assignments = parse_matches(&raw, slides.len(), &known);

        for (index, id) in &assignments {
            if let Some(image) = by_id.get(id.as_str()) {
                slides[*index].image_path = Some(image.path.clone());
            }
        }
        info!(matched = assignments.len(), "images matched to slides");
        ImageMatchOutcome::Matched { assignments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, description: &str, decorative: bool) -> ImageRecord {
        ImageRecord {
            id: id.into(),
            path: format!("/imgs/{id}.png"),
            description: description.into(),
            is_decorative: decorative,
            ..Default::default()
        }
    }

    #[test]
    fn decorative_images_are_filtered() {
        let images = vec![
            image("a", "Publisher logo", false),
            image("b", "Vector search diagram", false),
            image("c", "Pipeline figure", true),
        ];
        let ids: Vec<&str> = candidate_images(&images).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn keyword_filter_relaxes_but_flag_holds() {
        let images = vec![
            image("a", "Small icon of a database", false),
            image("b", "Company logo", true),
        ];
        let ids: Vec<&str> = candidate_images(&images).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn downsample_spreads_evenly() {
        let items: Vec<usize> = (0..100).collect();
        let picked = downsample(&items, 25);
        assert_eq!(picked.len(), 25);
        assert_eq!(picked[0], 0);
        assert_eq!(picked[1], 4);
        assert_eq!(picked[24], 96);

        let few = [1, 2, 3];
        assert_eq!(downsample(&few, 25), vec![1, 2, 3]);
    }

    #[test]
    fn parser_is_permissive_and_keeps_first_matches() {
        let known: HashSet<&str> = ["img_1", "img_2", "img_3"].into_iter().collect();
        let raw = "Here are the matches:\n0:img_1\n- 1 -> img_2\n0: img_3\n2 = img_1\nslide 3: \"img_3\"\n9:img_2\nnot a match\n4:img_404";
        let matches = parse_matches(raw, 5, &known);
        assert_eq!(
            matches,
            vec![
                (0, "img_1".to_string()),
                (1, "img_2".to_string()),
                (3, "img_3".to_string()),
            ]
        );
    }

    #[test]
    fn none_reply_yields_no_matches() {
        let known: HashSet<&str> = ["img_1"].into_iter().collect();
        assert!(parse_matches("NONE", 3, &known).is_empty());
    }
}
