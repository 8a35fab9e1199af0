//! Text Extractor: turns a résumé file into cleaned plain text.
//!
//! The contract callers rely on is "cleaned text, or an empty string": every
//! per-format failure is logged here and never propagated.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

mod docx;
#[cfg(test)]
pub mod stub;

/// Extensions eligible for batch discovery (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("antiword failed: {0}")]
    Antiword(String),

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Extraction task aborted: {0}")]
    Aborted(String),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns cleaned text, or an empty string when the file cannot be read.
    async fn extract(&self, path: &Path) -> String;
}

/// Production extractor dispatching on file extension.
#[derive(Debug, Default, Clone)]
pub struct FileTextExtractor;

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract(&self, path: &Path) -> String {
        match read_raw(path).await {
            Ok(raw) => {
                let text = clean_text(&raw);
                debug!(file = %path.display(), chars = text.len(), "Extracted text");
                text
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Cannot extract text");
                String::new()
            }
        }
    }
}

/// Lowercased extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

async fn read_raw(path: &Path) -> Result<String, ExtractError> {
    let ext = extension_of(path).unwrap_or_default();
    match ext.as_str() {
        "pdf" => {
            let owned = path.to_path_buf();
            tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text(&owned).map_err(|e| ExtractError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| ExtractError::Aborted(e.to_string()))?
        }
        "docx" => {
            let owned = path.to_path_buf();
            tokio::task::spawn_blocking(move || docx::extract(&owned))
                .await
                .map_err(|e| ExtractError::Aborted(e.to_string()))?
        }
        "doc" => read_legacy_doc(path).await,
        "txt" => {
            let bytes = tokio::fs::read(path).await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        other => Err(ExtractError::Unsupported(if other.is_empty() {
            "(no extension)".to_string()
        } else {
            other.to_string()
        })),
    }
}

/// Legacy Word files go through the external `antiword` tool.
async fn read_legacy_doc(path: &Path) -> Result<String, ExtractError> {
    let output = tokio::process::Command::new("antiword")
        .arg(path)
        .output()
        .await
        .map_err(|e| ExtractError::Antiword(e.to_string()))?;

    if !output.status.success() {
        return Err(ExtractError::Antiword(format!(
            "exit status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Collapses whitespace runs, drops non-ASCII characters, trims.
pub fn clean_text(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    let ascii: String = collapsed.chars().filter(char::is_ascii).collect();
    ascii.trim().to_string()
}
