//! Per-slide narration audio and the lesson timeline.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::{
    error::{BookcastError, Result},
    media::MediaTool,
    tts::SpeechSynthesizer,
    types::{LessonVideoPlan, Slide, SlideTiming},
};

const CODE_MENTION: &str = "We'll look at a short code example to reinforce the concept.";

/// Narration spoken for a slide that has none: its title, then its bullets, then a
/// short code mention when the slide carries a snippet.
pub fn default_slide_narration(slide: &Slide) -> String {
    let mut parts: Vec<&str> = vec![slide.title.trim()];
    parts.extend(slide.bullets.iter().map(|b| b.trim()));
    if slide.code_snippet.is_some() {
        parts.push(CODE_MENTION);
    }
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text actually synthesized for `slide`.
pub fn spoken_text(slide: &Slide) -> String {
    if slide.has_narration() {
        slide.narration.trim().to_string()
    } else {
        default_slide_narration(slide)
    }
}

/// Contiguous `[start, end)` windows from per-slide durations, in slide order.
pub fn compute_timings(durations: &[f64]) -> Vec<SlideTiming> {
    durations
        .iter()
        .enumerate()
        .scan(0.0_f64, |clock, (slide_index, duration)| {
            let start_sec = *clock;
            *clock += duration.max(0.0);
            Some(SlideTiming {
                slide_index,
                start_sec,
                end_sec: *clock,
            })
        })
        .collect()
}

/// Whole seconds covering the track, so the video never outlasts the narration
/// by more than the final fractional second.
pub fn total_duration(timings: &[SlideTiming]) -> u32 {
    timings.last().map_or(0, |t| t.end_sec.ceil() as u32)
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub segments: Vec<PathBuf>,
    pub duration_sec: f64,
}

pub struct AudioTimingBuilder<'a> {
    tts: &'a dyn SpeechSynthesizer,
    media: &'a dyn MediaTool,
}

impl<'a> AudioTimingBuilder<'a> {
    pub fn new(tts: &'a dyn SpeechSynthesizer, media: &'a dyn MediaTool) -> Self {
        Self { tts, media }
    }

    /// Synthesize every slide in order, then fill in `plan.slide_timings` and
    /// overwrite `plan.total_duration_sec`. Segments land in `segments_dir`; the joined
    /// track is written to `output`.
    pub async fn build(
        &self,
        plan: &mut LessonVideoPlan,
        segments_dir: &Path,
        output: &Path,
    ) -> Result<AudioTrack> {
        if plan.slides.is_empty() {
            return Err(BookcastError::EmptyPlan {
                lesson_id: plan.lesson_id.clone(),
            });
        }
        fs::create_dir_all(segments_dir).await?;

        let mut segments = Vec::with_capacity(plan.slides.len());
        let mut durations = Vec::with_capacity(plan.slides.len());

        for (idx, slide) in plan.slides.iter().enumerate() {
            let segment = self
                .synthesize_segment(&plan.lesson_id, idx, slide, segments_dir)
                .await?;
            let duration = self.media.duration(&segment).await?;
            debug!(slide = idx, duration, "slide audio ready");
            durations.push(duration);
            segments.push(segment);
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }
        self.media.concat(&segments, output).await?;

        plan.slide_timings = compute_timings(&durations);
        plan.total_duration_sec = total_duration(&plan.slide_timings);
        let duration_sec = plan.slide_timings.last().map_or(0.0, |t| t.end_sec);

        info!(
            lesson = %plan.lesson_id,
            slides = plan.slides.len(),
            duration_sec,
            "lesson audio built"
        );

        Ok(AudioTrack {
            path: output.to_path_buf(),
            segments,
            duration_sec,
        })
    }

    async fn synthesize_segment(
        &self,
        lesson_id: &str,
        index: usize,
        slide: &Slide,
        segments_dir: &Path,
    ) -> Result<PathBuf> {
        let audio = self.tts.synthesize(&spoken_text(slide)).await?;
        let stem = format!("{lesson_id}_slide_{index}");
        let wav = segments_dir.join(format!("{stem}.wav"));

        let extension = self.tts.extension();
        if extension == "wav" {
            fs::write(&wav, audio).await?;
        } else {
            let raw = segments_dir.join(format!("{stem}.{extension}"));
            fs::write(&raw, audio).await?;
            self.media.normalize(&raw, &wav).await?;
        }
        Ok(wav)
    }
}
