//! Case-file loading.
//!
//! Text files are decoded as UTF-8, replacing invalid sequences instead of
//! failing. PDFs are converted to plain text with `pdf-extract`. The upload
//! identity is the file name.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed for {path}: {message}")]
    Pdf { path: String, message: String },
}

/// A decoded upload ready for indexing.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name used to decide whether the index must be rebuilt.
    pub identity: String,
    pub text: String,
}

/// Read a case file from disk.
pub fn load_document(path: &Path) -> Result<LoadedDocument, ExtractError> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: display.clone(),
        source,
    })?;

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let text = if is_pdf {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf {
            path: display.clone(),
            message: e.to_string(),
        })?
    } else {
        decode_text(&bytes)
    };

    let identity = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(display);

    Ok(LoadedDocument { identity, text })
}

/// Lossy UTF-8 decoding with the replacement characters removed, matching
/// a decoder that ignores errors.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\u{FFFD}', "")
}
