//! File-based persistence, keyed by book id and lesson id.
//!
//! Writes are plain overwrites with no locking: two concurrent regenerations of the
//! same lesson race on the script and props files.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::warn;

use crate::{
    content::LessonContent,
    error::{BookcastError, Result},
    types::{CourseOutline, ImageRecord, QuizQuestion},
};

#[derive(Debug, Clone)]
pub struct BookStore {
    root: PathBuf,
}

pub fn new_book_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl BookStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-book working directory for audio, props and rendered video.
    pub fn book_dir(&self, book_id: &str) -> PathBuf {
        self.root.join(book_id)
    }

    pub fn text_path(&self, book_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}.txt"))
    }

    pub fn images_path(&self, book_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}_images.json"))
    }

    pub fn outline_path(&self, book_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}_outline.json"))
    }

    pub fn script_path(&self, book_id: &str, lesson_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}_{lesson_id}_script.txt"))
    }

    pub fn quiz_path(&self, book_id: &str, lesson_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}_{lesson_id}_quiz.json"))
    }

    pub fn content_path(&self, book_id: &str, lesson_id: &str) -> PathBuf {
        self.root.join(format!("{book_id}_{lesson_id}_content.json"))
    }

    pub fn segments_dir(&self, book_id: &str, lesson_id: &str) -> PathBuf {
        self.book_dir(book_id).join("audio_segments").join(lesson_id)
    }

    pub fn lesson_audio_path(&self, book_id: &str, lesson_id: &str) -> PathBuf {
        self.book_dir(book_id).join(format!("{lesson_id}_audio.wav"))
    }

    pub fn props_path(&self, book_id: &str, lesson_index: usize) -> PathBuf {
        self.book_dir(book_id)
            .join(format!("lesson_{lesson_index}_props.json"))
    }

    pub fn video_path(&self, book_id: &str, lesson_index: usize) -> PathBuf {
        self.book_dir(book_id).join(format!("lesson_{lesson_index}.mp4"))
    }

    pub fn avatar_path(&self, book_id: &str, lesson_index: usize) -> PathBuf {
        self.book_dir(book_id)
            .join(format!("lesson_{lesson_index}_avatar.mp4"))
    }

    /// Flat location first, then the same file name nested under the book directory.
    fn candidates(&self, book_id: &str, flat: PathBuf) -> [PathBuf; 2] {
        let nested = match flat.file_name() {
            Some(name) => self.book_dir(book_id).join(name),
            None => flat.clone(),
        };
        [flat, nested]
    }

    pub async fn save_book_text(&self, book_id: &str, text: &str) -> Result<PathBuf> {
        let path = self.text_path(book_id);
        write_text(&path, text).await?;
        Ok(path)
    }

    pub async fn load_book_text(&self, book_id: &str) -> Result<String> {
        let path = self.text_path(book_id);
        if !path.exists() {
            return Err(BookcastError::MissingBookText {
                book_id: book_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path).await?)
    }

    pub async fn save_images(&self, book_id: &str, images: &[ImageRecord]) -> Result<()> {
        write_json(&self.images_path(book_id), &images).await
    }

    /// Image records for a book; missing or malformed metadata reads as "no images".
    pub async fn load_images(&self, book_id: &str) -> Vec<ImageRecord> {
        read_json_lenient(&self.images_path(book_id))
            .await
            .unwrap_or_default()
    }

    pub async fn save_outline(&self, book_id: &str, outline: &CourseOutline) -> Result<()> {
        write_json(&self.outline_path(book_id), outline).await
    }

    pub async fn load_outline(&self, book_id: &str) -> Option<CourseOutline> {
        read_json_lenient(&self.outline_path(book_id)).await
    }

    pub async fn save_script(&self, book_id: &str, lesson_id: &str, script: &str) -> Result<PathBuf> {
        let path = self.script_path(book_id, lesson_id);
        write_text(&path, script).await?;
        Ok(path)
    }

    pub async fn load_script(&self, book_id: &str, lesson_id: &str) -> Option<String> {
        for path in self.candidates(book_id, self.script_path(book_id, lesson_id)) {
            if let Ok(text) = fs::read_to_string(&path).await {
                return Some(text);
            }
        }
        None
    }

    pub async fn save_quiz(&self, book_id: &str, lesson_id: &str, quiz: &[QuizQuestion]) -> Result<()> {
        write_json(&self.quiz_path(book_id, lesson_id), &quiz).await
    }

    pub async fn load_quiz(&self, book_id: &str, lesson_id: &str) -> Option<Vec<QuizQuestion>> {
        for path in self.candidates(book_id, self.quiz_path(book_id, lesson_id)) {
            if let Some(quiz) = read_json_lenient(&path).await {
                return Some(quiz);
            }
        }
        None
    }

    pub async fn load_content(&self, book_id: &str, lesson_id: &str) -> Option<LessonContent> {
        for path in self.candidates(book_id, self.content_path(book_id, lesson_id)) {
            if let Some(content) = read_json_lenient(&path).await {
                return Some(content);
            }
        }
        None
    }

    pub async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        write_json(path, value).await
    }
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, text).await?;
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(value)?;
    write_text(path, &pretty_json).await
}

/// `None` when the file is absent or does not parse.
async fn read_json_lenient<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LessonOutline;

    #[tokio::test]
    async fn scripts_are_found_in_flat_or_nested_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookStore::new(dir.path());

        assert!(store.load_script("b1", "lesson_1").await.is_none());

        let nested = store.book_dir("b1").join("b1_lesson_1_script.txt");
        std::fs::create_dir_all(nested.parent().unwrap()).unwrap();
        std::fs::write(&nested, "Nested script.").unwrap();
        assert_eq!(
            store.load_script("b1", "lesson_1").await.as_deref(),
            Some("Nested script.")
        );

        store.save_script("b1", "lesson_1", "Flat script.").await.unwrap();
        assert_eq!(
            store.load_script("b1", "lesson_1").await.as_deref(),
            Some("Flat script.")
        );
    }

    #[tokio::test]
    async fn malformed_outline_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookStore::new(dir.path());
        std::fs::write(store.outline_path("b1"), "{ not json").unwrap();
        assert!(store.load_outline("b1").await.is_none());

        let outline = CourseOutline {
            course_title: "RAG".into(),
            lessons: vec![LessonOutline {
                id: "lesson_1".into(),
                title: "Intro".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        store.save_outline("b1", &outline).await.unwrap();
        let loaded = store.load_outline("b1").await.unwrap();
        assert_eq!(loaded.lessons[0].title, "Intro");
    }

    #[tokio::test]
    async fn missing_text_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookStore::new(dir.path());
        let err = store.load_book_text("nope").await.unwrap_err();
        assert!(matches!(err, BookcastError::MissingBookText { .. }));
    }
}
