//! PDF processing: inspection, embedded text and page rasterization.

mod inspect;
mod rasterizer;

pub use inspect::{PdfInfo, embedded_text, inspect};
pub use rasterizer::PopplerRasterizer;

use std::path::Path;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::ExtractionError;

/// Renders PDF pages to raster images.
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    /// Short rasterizer name for logs.
    fn name(&self) -> &str;

    /// Render the pages of the PDF at `path`, in page order.
    ///
    /// `max_pages` of 0 renders every page.
    async fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        max_pages: usize,
    ) -> Result<Vec<DynamicImage>, ExtractionError>;
}

#[cfg(test)]
pub(crate) use inspect::blank_pdf;
