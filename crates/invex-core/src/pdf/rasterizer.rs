//! Page rendering through Poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::config::PdfConfig;
use crate::tool;

use super::PdfRasterizer;

const PAGE_PREFIX: &str = "page";

/// Rasterizer that shells out to `pdftoppm`.
pub struct PopplerRasterizer {
    program: PathBuf,
    timeout: Duration,
}

impl PopplerRasterizer {
    /// Create a rasterizer from configuration.
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            program: config.pdftoppm_cmd.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Check whether the configured binary can be started.
    pub async fn is_available(&self) -> bool {
        tool::is_available(&self.program, "-v").await
    }

    fn command(&self, pdf: &Path, out_prefix: &Path, dpi: u32, max_pages: usize) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-png").arg("-r").arg(dpi.to_string());
        if max_pages > 0 {
            command.arg("-f").arg("1").arg("-l").arg(max_pages.to_string());
        }
        command.arg(pdf).arg(out_prefix);
        command
    }
}

#[async_trait]
impl PdfRasterizer for PopplerRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn render_pages(
        &self,
        path: &Path,
        dpi: u32,
        max_pages: usize,
    ) -> Result<Vec<DynamicImage>, ExtractionError> {
        let out_dir = tempfile::Builder::new().prefix("invex-pages-").tempdir()?;
        let prefix = out_dir.path().join(PAGE_PREFIX);

        tool::run(
            self.command(path, &prefix, dpi, max_pages),
            &tool::tool_name(&self.program),
            self.timeout,
        )
        .await?;

        let mut pages = Vec::new();
        for entry in std::fs::read_dir(out_dir.path())? {
            let path = entry?.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        // pdftoppm zero-pads to the page count's width, so sort numerically.
        pages.sort_by_key(|(number, _)| *number);

        if pages.is_empty() {
            return Err(ExtractionError::NoRenderedPages);
        }

        let mut images = Vec::with_capacity(pages.len());
        for (number, path) in &pages {
            debug!("Loading rendered page {} from {}", number, path.display());
            images.push(image::open(path)?);
        }

        info!("Rendered {} pages at {} DPI", images.len(), dpi);
        Ok(images)
    }
}

/// Page number of a `pdftoppm` output file such as `page-07.png`.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(PAGE_PREFIX)?.trim_start_matches('-');
    digits.parse().ok()
}
