use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::ExtractionError;

/// Boundary with the PDF-to-text collaborator.
pub trait TextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Runs poppler's `pdftotext` and joins the pages with newlines.
#[derive(Debug, Clone, Default)]
pub struct PdftotextExtractor {
    pub max_pages: Option<usize>,
}

impl TextExtractor for PdftotextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::FileNotFound(path.display().to_string()));
        }

        let mut command = Command::new("pdftotext");
        command.arg("-enc").arg("UTF-8").arg("-q").arg("-f").arg("1");
        if let Some(max_pages) = self.max_pages {
            command.arg("-l").arg(max_pages.to_string());
        }
        command.arg(path).arg("-");

        let output = command.output().map_err(|error| ExtractionError::ToolFailed {
            path: path.display().to_string(),
            reason: format!("failed to execute pdftotext: {error}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lowered = stderr.to_lowercase();
            if lowered.contains("encrypt") || lowered.contains("password") {
                return Err(ExtractionError::EncryptedPdf(path.display().to_string()));
            }
            return Err(ExtractionError::ToolFailed {
                path: path.display().to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&raw);
        debug!(path = %path.display(), pages = pages.len(), "extracted text layer");

        require_text(path, pages.join("\n"))
    }
}

/// Reads UTF-8 text files directly; used for `.txt` sources and fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        if !path.exists() {
            return Err(ExtractionError::FileNotFound(path.display().to_string()));
        }

        let raw = fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let text = String::from_utf8_lossy(&raw).replace('\u{0000}', "");

        require_text(path, text)
    }
}

/// Dispatches on file extension: `.txt` is read as-is, anything else goes
/// through `pdftotext`.
#[derive(Debug, Clone, Default)]
pub struct FileTextExtractor {
    pub pdf: PdftotextExtractor,
}

impl TextExtractor for FileTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let is_text = path
            .extension()
            .and_then(|value| value.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("txt"));

        if is_text {
            PlainTextExtractor.extract_text(path)
        } else {
            self.pdf.extract_text(path)
        }
    }
}

fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    pages
}

fn require_text(path: &Path, text: String) -> Result<String, ExtractionError> {
    if text.chars().all(char::is_whitespace) {
        return Err(ExtractionError::NoExtractableText(
            path.display().to_string(),
        ));
    }
    Ok(text)
}
