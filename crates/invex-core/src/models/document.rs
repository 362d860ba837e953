//! Uploaded documents and their kind, resolved from the file name.

use std::path::Path;

use image::ImageFormat;

use crate::error::InvexError;

/// Extensions accepted for upload, as offered by the front ends.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// What kind of document an upload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// PDF document, rendered page by page before OCR.
    Pdf,
    /// Raster image, OCRed directly.
    Image(ImageFormat),
}

impl DocumentKind {
    /// Resolve the kind from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, InvexError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "jpg" | "jpeg" => Ok(DocumentKind::Image(ImageFormat::Jpeg)),
            "png" => Ok(DocumentKind::Image(ImageFormat::Png)),
            _ => Err(InvexError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// A file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    file_name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Create a document, rejecting unsupported extensions up front.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, InvexError> {
        let file_name = file_name.into();
        let kind = DocumentKind::from_file_name(&file_name)?;
        Ok(Self { file_name, kind, bytes })
    }

    /// Read a document from disk.
    pub fn from_path(path: &Path) -> Result<Self, InvexError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        // Reject before reading so unsupported files are never touched.
        let kind = DocumentKind::from_file_name(&file_name)?;
        let bytes = std::fs::read(path).map_err(crate::error::ExtractionError::from)?;
        Ok(Self { file_name, kind, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
