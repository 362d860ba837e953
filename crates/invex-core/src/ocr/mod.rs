//! OCR seam and the Tesseract-backed engine.

mod tesseract;

pub use tesseract::TesseractEngine;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::ExtractionError;

/// Recognizes text in a decoded image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Run recognition on one image and return its plain text.
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionError>;
}
