//! Multi-format text extraction for uploaded documents.
//!
//! Ingestion supplies a spooled file plus its detected [`FileKind`]; this
//! module returns plain UTF-8 text. PDF pages are concatenated in page
//! order, plain text and markdown are decoded as strict UTF-8, and images
//! go through Tesseract OCR.

use std::path::Path;

use thiserror::Error;

/// File extensions accepted by the ingestion pipeline.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["pdf", "txt", "md", "png", "jpg", "jpeg"];

/// Input format, detected from the uploaded file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Image,
}

impl FileKind {
    /// Detect the format from a filename's extension (case-insensitive).
    /// Returns `None` for anything outside [`SUPPORTED_EXTENSIONS`], which
    /// the pipeline rejects before any extraction attempt.
    pub fn from_filename(filename: &str) -> Option<FileKind> {
        let ext = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "txt" | "md" => Some(FileKind::Text),
            "png" | "jpg" | "jpeg" => Some(FileKind::Image),
            _ => None,
        }
    }
}

/// Extraction failure. Aborts ingestion for the file; no partial chunks are
/// ever produced from a document that failed to extract.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("text decoding failed: {0}")]
    Text(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Extract plain text from the file at `path` according to `kind`.
pub fn extract_text(path: &Path, kind: FileKind) -> Result<String, ExtractError> {
    match kind {
        FileKind::Pdf => extract_pdf(path),
        FileKind::Text => extract_plain_text(path),
        FileKind::Image => extract_image(path),
    }
}

fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_plain_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Text(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExtractError::Text(e.to_string()))
}

fn extract_image(path: &Path) -> Result<String, ExtractError> {
    let path = path.to_string_lossy();
    let image = rusty_tesseract::Image::from_path(&*path)
        .map_err(|e| ExtractError::Ocr(e.to_string()))?;
    let args = rusty_tesseract::Args::default();
    rusty_tesseract::image_to_string(&image, &args).map_err(|e| ExtractError::Ocr(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_supported_extensions() {
        assert_eq!(FileKind::from_filename("report.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("notes.txt"), Some(FileKind::Text));
        assert_eq!(FileKind::from_filename("README.md"), Some(FileKind::Text));
        assert_eq!(FileKind::from_filename("scan.png"), Some(FileKind::Image));
        assert_eq!(FileKind::from_filename("photo.JPG"), Some(FileKind::Image));
        assert_eq!(FileKind::from_filename("photo.jpeg"), Some(FileKind::Image));
    }

    #[test]
    fn rejects_unsupported_extensions() {
        assert_eq!(FileKind::from_filename("archive.xyz"), None);
        assert_eq!(FileKind::from_filename("doc.docx"), None);
        assert_eq!(FileKind::from_filename("no_extension"), None);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a pdf").unwrap();
        let err = extract_text(file.path(), FileKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_utf8_text_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0xfd]).unwrap();
        let err = extract_text(file.path(), FileKind::Text).unwrap_err();
        assert!(matches!(err, ExtractError::Text(_)));
    }

    #[test]
    fn plain_text_decodes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Hello world".as_bytes()).unwrap();
        let text = extract_text(file.path(), FileKind::Text).unwrap();
        assert_eq!(text, "Hello world");
    }
}
