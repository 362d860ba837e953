//! Text extraction: turns an uploaded PDF or image into plain text.

use std::io::Write;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::models::config::{InvexConfig, PdfConfig};
use crate::models::document::{DocumentKind, UploadedDocument};
use crate::ocr::{OcrEngine, TesseractEngine};
use crate::pdf::{self, PdfRasterizer, PopplerRasterizer};

/// Where extracted text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Recognized from page images.
    Ocr,
    /// Read from the PDF's own text layer.
    EmbeddedPdfText,
}

/// Text extracted from one document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    /// Full text, pages concatenated in order.
    pub text: String,
    /// Per-page text (a single entry for images).
    pub pages: Vec<String>,
    /// How the text was obtained.
    pub source: TextSource,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractedText {
    fn from_pages(pages: Vec<String>, source: TextSource, start: Instant) -> Self {
        Self {
            text: pages.concat(),
            pages,
            source,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Dispatches documents to rendering and OCR.
pub struct TextExtractor {
    ocr: Box<dyn OcrEngine>,
    rasterizer: Box<dyn PdfRasterizer>,
    config: PdfConfig,
}

impl TextExtractor {
    /// Create an extractor from explicit collaborators.
    pub fn new(ocr: Box<dyn OcrEngine>, rasterizer: Box<dyn PdfRasterizer>, config: PdfConfig) -> Self {
        Self {
            ocr,
            rasterizer,
            config,
        }
    }

    /// Create an extractor backed by Tesseract and pdftoppm.
    pub fn from_config(config: &InvexConfig) -> Self {
        Self::new(
            Box::new(TesseractEngine::new(config.ocr.clone())),
            Box::new(PopplerRasterizer::new(&config.pdf)),
            config.pdf.clone(),
        )
    }

    /// Extract text from a document.
    pub async fn extract(&self, document: &UploadedDocument) -> Result<ExtractedText> {
        info!("Extracting text from {}", document.file_name());
        let text = match document.kind() {
            DocumentKind::Pdf => self.extract_pdf(document.bytes()).await?,
            DocumentKind::Image(format) => self.extract_image(document.bytes(), format).await?,
        };
        info!(
            "Extracted {} chars from {} page(s) in {}ms",
            text.text.len(),
            text.pages.len(),
            text.processing_time_ms
        );
        Ok(text)
    }

    async fn extract_pdf(&self, data: &[u8]) -> std::result::Result<ExtractedText, ExtractionError> {
        let start = Instant::now();
        match pdf::inspect(data) {
            Ok(info) => debug!(
                "PDF has {} pages (encrypted: {})",
                info.page_count, info.was_encrypted
            ),
            Err(ExtractionError::NoPages) => return Err(ExtractionError::NoPages),
            Err(e) => warn!(
                "lopdf could not read the PDF ({}), leaving it to {}",
                e,
                self.rasterizer.name()
            ),
        }

        if self.config.prefer_embedded_text {
            match pdf::embedded_text(data) {
                Ok(text) if text.trim().len() >= self.config.min_text_length => {
                    debug!("Using embedded text layer ({} chars)", text.len());
                    return Ok(ExtractedText::from_pages(vec![text], TextSource::EmbeddedPdfText, start));
                }
                Ok(_) => debug!("Embedded text too short, falling back to OCR"),
                Err(e) => warn!("Embedded text extraction failed, falling back to OCR: {}", e),
            }
        }

        // Removed when `source` drops, whatever happens below.
        let mut source = tempfile::Builder::new()
            .prefix("invex-upload-")
            .suffix(".pdf")
            .tempfile()?;
        source.write_all(data)?;
        source.flush()?;

        let images = self
            .rasterizer
            .render_pages(source.path(), self.config.render_dpi, self.config.max_pages)
            .await?;

        let mut pages = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            debug!("OCR on page {}/{} with {}", i + 1, images.len(), self.ocr.name());
            let text = self.ocr.recognize(image).await?;
            if text.trim().is_empty() {
                warn!("No text detected on page {}", i + 1);
            }
            pages.push(text);
        }

        Ok(ExtractedText::from_pages(pages, TextSource::Ocr, start))
    }

    async fn extract_image(
        &self,
        data: &[u8],
        format: image::ImageFormat,
    ) -> std::result::Result<ExtractedText, ExtractionError> {
        let start = Instant::now();
        let image = image::load_from_memory_with_format(data, format)
            .or_else(|_| image::load_from_memory(data))?;
        let text = self.ocr.recognize(&image).await?;
        Ok(ExtractedText::from_pages(vec![text], TextSource::Ocr, start))
    }
}
