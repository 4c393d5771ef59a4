//! Document text extraction.
//!
//! I/O adapters with no decision logic: given a path, return the plain
//! text the pipeline chunks and feeds to the generator. Supported inputs
//! are PDF, DOCX and plain text/markdown; anything else is rejected up
//! front rather than mis-read.

use std::fs;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

pub mod docx;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("unsupported document type {0:?} (expected pdf, docx, txt or md)")]
    UnsupportedExtension(String),
}

/// Extract plain text from a document, dispatching on the file extension.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    tracing::debug!(path = %path.display(), extension = %extension, "extracting document text");

    match extension.as_str() {
        "txt" | "md" => Ok(fs::read_to_string(path)?),
        "pdf" => extract_pdf(path),
        "docx" => docx::extract_docx(path),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Read one entry of a DOCX container into a string.
pub(crate) fn read_archive_entry(path: &Path, entry: &str) -> Result<String, ExtractError> {
    let file = fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut content = String::new();
    archive
        .by_name(entry)
        .map_err(|e| ExtractError::Docx(format!("missing {entry}: {e}")))?
        .read_to_string(&mut content)?;
    Ok(content)
}
