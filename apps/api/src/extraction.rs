//! Text extraction from uploaded documents, dispatched on MIME type.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tokio::fs;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("document contains no text")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    /// Resolves a MIME type (parameters such as `; charset=utf-8` are ignored).
    pub fn from_mime(mime: &str) -> Result<Self, ExtractionError> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Ok(DocumentKind::Pdf),
            MIME_DOCX => Ok(DocumentKind::Docx),
            MIME_TEXT => Ok(DocumentKind::PlainText),
            _ => Err(ExtractionError::UnsupportedType(mime.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => ".pdf",
            DocumentKind::Docx => ".docx",
            DocumentKind::PlainText => ".txt",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => MIME_PDF,
            DocumentKind::Docx => MIME_DOCX,
            DocumentKind::PlainText => MIME_TEXT,
        }
    }

    /// Best guess from a stored file name, for serving downloads.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// Reads the stored file and returns its plain text, trimmed.
pub async fn extract_text(kind: DocumentKind, path: &Path) -> Result<String, ExtractionError> {
    let text = match kind {
        DocumentKind::PlainText => String::from_utf8_lossy(&fs::read(path).await?).into_owned(),
        DocumentKind::Pdf => {
            let bytes = fs::read(path).await?;
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| ExtractionError::Pdf(e.to_string()))?
                .map_err(|e| ExtractionError::Pdf(e.to_string()))?
        }
        DocumentKind::Docx => {
            let bytes = fs::read(path).await?;
            tokio::task::spawn_blocking(move || docx_text(&bytes))
                .await
                .map_err(|e| ExtractionError::Docx(e.to_string()))??
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }
    Ok(text)
}

/// Pulls run text out of `word/document.xml`. Paragraphs and breaks become newlines.
fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(e.to_string()))?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let unescaped = t.unescape().map_err(|e| ExtractionError::Docx(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Docx(e.to_string())),
            _ => {}
        }
    }

    Ok(text)
}
