//! OCR engine wrapper around the `tesseract` command-line tool.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ExtractionError;
use crate::models::config::OcrConfig;
use crate::tool;

use super::OcrEngine;

/// OCR engine backed by an installed Tesseract binary.
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    /// Create an engine from configuration.
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Check whether the configured binary can be started.
    pub async fn is_available(&self) -> bool {
        tool::is_available(&self.config.tesseract_cmd, "--version").await
    }

    fn command(&self, image_path: &std::path::Path) -> Command {
        let mut command = Command::new(&self.config.tesseract_cmd);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language);
        if let Some(psm) = self.config.page_seg_mode {
            command.arg("--psm").arg(psm.to_string());
        }
        command
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Recognizing image: {}x{}", width, height);

        // Removed when `input` drops, on every return path.
        let mut input = tempfile::Builder::new()
            .prefix("invex-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.write_to(input.as_file_mut(), ImageFormat::Png)?;

        let output = tool::run(
            self.command(input.path()),
            &tool::tool_name(&self.config.tesseract_cmd),
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();

        info!(
            "OCR complete: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_arguments() {
        let engine = TesseractEngine::new(OcrConfig {
            tesseract_cmd: PathBuf::from("/opt/tesseract"),
            language: "eng+deu".to_string(),
            page_seg_mode: Some(6),
            timeout_secs: 5,
        });
        let command = engine.command(std::path::Path::new("/tmp/page.png"));
        let std_command = command.as_std();

        assert_eq!(std_command.get_program(), "/opt/tesseract");
        let args: Vec<_> = std_command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["/tmp/page.png", "stdout", "-l", "eng+deu", "--psm", "6"]);
    }

    #[tokio::test]
    async fn test_missing_binary_is_extraction_error() {
        let engine = TesseractEngine::new(OcrConfig {
            tesseract_cmd: PathBuf::from("invex-missing-tesseract"),
            ..OcrConfig::default()
        });
        let image = DynamicImage::new_rgb8(8, 8);
        let err = engine.recognize(&image).await.unwrap_err();
        assert!(matches!(err, ExtractionError::ToolMissing { ref tool, .. } if tool == "invex-missing-tesseract"));
        assert!(!engine.is_available().await);
    }
}
