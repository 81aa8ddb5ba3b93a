//! Book text extraction and ingestion into the store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::info;

use crate::{
    error::{BookcastError, Result},
    store::{BookStore, new_book_id},
    types::ImageRecord,
};

/// Pages of a PDF read during ingestion.
pub const PDF_PAGE_LIMIT: u32 = 50;

#[async_trait]
pub trait BookExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Poppler's `pdftotext`, reading the first [`PDF_PAGE_LIMIT`] pages.
pub struct PdfToText;

#[async_trait]
impl BookExtractor for PdfToText {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let failed = |reason: String| BookcastError::ExtractionFailed {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new("pdftotext")
            .args(["-f", "1", "-l"])
            .arg(PDF_PAGE_LIMIT.to_string())
            .args(["-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| failed(format!("could not run pdftotext: {e}")))?;

        if !output.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Plain-text books are taken as-is.
pub struct PlainText;

#[async_trait]
impl BookExtractor for PlainText {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path).await?)
    }
}

/// Extractor chosen by file extension.
pub fn extractor_for(path: &Path) -> Box<dyn BookExtractor> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Box::new(PdfToText)
    } else {
        Box::new(PlainText)
    }
}

#[derive(Debug, Clone)]
pub struct IngestedBook {
    pub book_id: String,
    pub text_path: PathBuf,
    pub chars: usize,
    pub images: usize,
}

/// Extract `source` into a fresh book id. Image records, when given, are read from an
/// existing JSON list.
pub async fn ingest_book(
    store: &BookStore,
    extractor: &dyn BookExtractor,
    source: &Path,
    images: Option<&Path>,
) -> Result<IngestedBook> {
    let text = extractor.extract_text(source).await?;
    if text.trim().is_empty() {
        return Err(BookcastError::ExtractionFailed {
            path: source.to_path_buf(),
            reason: "no text found".to_string(),
        });
    }

    let records: Vec<ImageRecord> = match images {
        Some(path) => serde_json::from_str(&fs::read_to_string(path).await?)?,
        None => Vec::new(),
    };

    let book_id = new_book_id();
    let text_path = store.save_book_text(&book_id, &text).await?;
    if !records.is_empty() {
        store.save_images(&book_id, &records).await?;
    }

    info!(book = %book_id, chars = text.len(), images = records.len(), "book ingested");
    Ok(IngestedBook {
        book_id,
        text_path,
        chars: text.chars().count(),
        images: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_books_are_ingested_with_images() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("book.txt");
        std::fs::write(&book, "Deep RAG\n\nChapter one.").unwrap();
        let images = dir.path().join("images.json");
        std::fs::write(
            &images,
            r#"[{"id": "img_1", "path": "/x/img_1.png", "page": 3, "description": "Vector index"}]"#,
        )
        .unwrap();

        let store = BookStore::new(dir.path().join("books"));
        let ingested = ingest_book(&store, &PlainText, &book, Some(images.as_path()))
            .await
            .unwrap();

        assert_eq!(ingested.images, 1);
        let text = store.load_book_text(&ingested.book_id).await.unwrap();
        assert!(text.starts_with("Deep RAG"));
        let loaded = store.load_images(&ingested.book_id).await;
        assert_eq!(loaded[0].page, 3);
    }

    #[tokio::test]
    async fn blank_books_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("blank.txt");
        std::fs::write(&book, "  \n").unwrap();
        let store = BookStore::new(dir.path());
        assert!(matches!(
            ingest_book(&store, &PlainText, &book, None).await,
            Err(BookcastError::ExtractionFailed { .. })
        ));
    }
}
