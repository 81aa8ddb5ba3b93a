//! Render hand-off: props document, public assets and the external renderer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, process::Command};
use tracing::{info, warn};

use crate::{
    config::RenderSettings,
    error::{BookcastError, Result},
    types::LessonVideoPlan,
};

/// Input document for the renderer. Asset references are public-root paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProps {
    pub plan: LessonVideoPlan,
    pub audio_src: String,
    pub avatar_src: Option<String>,
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render the props document at `props` into `output`.
    async fn render(&self, lesson_id: &str, props: &Path, output: &Path) -> Result<()>;
}

/// Remotion project driven through `npx remotion render`.
pub struct RemotionRenderer {
    command: String,
    project_dir: PathBuf,
    composition: String,
}

impl RemotionRenderer {
    pub fn new(settings: &RenderSettings) -> Self {
        Self {
            command: settings.command.clone(),
            project_dir: settings.project_dir.clone(),
            composition: settings.composition.clone(),
        }
    }

    fn args(&self, props: &Path, output: &Path) -> Vec<String> {
        vec![
            "remotion".to_string(),
            "render".to_string(),
            self.composition.clone(),
            output.display().to_string(),
            format!("--props={}", props.display()),
        ]
    }
}

#[async_trait]
impl VideoRenderer for RemotionRenderer {
    async fn render(&self, lesson_id: &str, props: &Path, output: &Path) -> Result<()> {
        let props = absolute(props)?;
        let output = absolute(output)?;
        info!(lesson = lesson_id, output = %output.display(), "rendering lesson video");

        let result = Command::new(&self.command)
            .args(self.args(&props, &output))
            .current_dir(&self.project_dir)
            .output()
            .await
            .map_err(|e| BookcastError::RenderFailed {
                lesson_id: lesson_id.to_string(),
                reason: format!("could not start {}: {e}", self.command),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(BookcastError::RenderFailed {
                lesson_id: lesson_id.to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Copies lesson assets into `{public_dir}/generated/{book_id}/`.
pub struct AssetStager {
    public_dir: PathBuf,
    book_id: String,
}

impl AssetStager {
    pub fn new(public_dir: impl Into<PathBuf>, book_id: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            book_id: book_id.into(),
        }
    }

    fn target_dir(&self) -> PathBuf {
        self.public_dir.join("generated").join(&self.book_id)
    }

    /// Copy `source` and return its public-root path, e.g. `/generated/{book}/x.wav`.
    pub async fn stage(&self, source: &Path) -> Result<String> {
        let name = source
            .file_name()
            .ok_or_else(|| BookcastError::Config(format!("not a file: {}", source.display())))?
            .to_string_lossy()
            .into_owned();
        self.stage_as(source, &name).await
    }

    /// Copy `source` under `name` inside the book's generated directory.
    pub async fn stage_as(&self, source: &Path, name: &str) -> Result<String> {
        let dir = self.target_dir();
        fs::create_dir_all(&dir).await?;
        fs::copy(source, dir.join(name)).await?;
        Ok(format!("/generated/{}/{name}", self.book_id))
    }

    /// Stage every matched slide image as `{lesson}_slide_{i}_{name}`. Images that cannot
    /// be copied are dropped from their slide so the renderer never sees an unreachable path.
    pub async fn stage_slide_images(&self, plan: &mut LessonVideoPlan) {
        let lesson_id = plan.lesson_id.clone();
        for (idx, slide) in plan.slides.iter_mut().enumerate() {
            let Some(path) = slide.image_path.take() else {
                continue;
            };
            let source = Path::new(&path);
            let Some(name) = source.file_name() else {
                warn!(image = %path, "dropping slide image without a file name");
                continue;
            };
            let staged = format!("{lesson_id}_slide_{idx}_{}", name.to_string_lossy());
            match self.stage_as(source, &staged).await {
                Ok(public) => slide.image_path = Some(public),
                Err(e) => warn!(image = %path, error = %e, "dropping slide image"),
            }
        }
    }
}
