//! The upload → text → fields flow shared by the web shell and the terminal.

use tracing::{info, warn};

use crate::error::{InvexError, Result};
use crate::extract::{ExtractedText, TextExtractor};
use crate::invoice::FieldExtractor;
use crate::models::config::InvexConfig;
use crate::models::document::UploadedDocument;
use crate::models::invoice::InvoiceRecord;
use crate::store::{AppendOutcome, RecordTable};

/// Everything produced for one upload, up to the first failure.
#[derive(Debug)]
pub struct ProcessReport {
    /// Name of the uploaded file.
    pub file_name: String,
    /// Extracted text, if extraction succeeded.
    pub text: Option<ExtractedText>,
    /// The service's raw reply, if the call succeeded.
    pub raw_response: Option<String>,
    /// Parsed fields, if the reply could be parsed.
    pub record: Option<InvoiceRecord>,
    /// The failure that stopped processing.
    pub error: Option<InvexError>,
}

impl ProcessReport {
    fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            text: None,
            raw_response: None,
            record: None,
            error: None,
        }
    }

    fn failed(mut self, error: InvexError) -> Self {
        warn!("Processing {} stopped: {}", self.file_name, error);
        self.error = Some(error);
        self
    }

    /// The record, when it may be offered for saving.
    pub fn savable_record(&self) -> Option<&InvoiceRecord> {
        match (&self.error, &self.record) {
            (None, Some(record)) if record.is_complete() => Some(record),
            _ => None,
        }
    }
}

/// Text extractor, field extractor and record table wired together.
pub struct Pipeline {
    extractor: TextExtractor,
    fields: FieldExtractor,
    table: RecordTable,
}

impl Pipeline {
    pub fn new(extractor: TextExtractor, fields: FieldExtractor, table: RecordTable) -> Self {
        Self {
            extractor,
            fields,
            table,
        }
    }

    /// Build the production pipeline from configuration.
    pub fn from_config(config: &InvexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            TextExtractor::from_config(config),
            FieldExtractor::from_config(&config.llm)?,
            RecordTable::from_config(&config.storage)?,
        ))
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    /// Process raw upload bytes.
    pub async fn process_upload(&self, file_name: &str, bytes: Vec<u8>) -> ProcessReport {
        match UploadedDocument::new(file_name, bytes) {
            Ok(document) => self.process(&document).await,
            Err(e) => ProcessReport::new(file_name).failed(e),
        }
    }

    /// Extract text, then fields. Stops at the first failure. Never saves.
    pub async fn process(&self, document: &UploadedDocument) -> ProcessReport {
        let mut report = ProcessReport::new(document.file_name());

        let text = match self.extractor.extract(document).await {
            Ok(text) => text,
            Err(e) => return report.failed(e),
        };
        let raw_response = self.fields.request(&text.text).await;
        report.text = Some(text);

        let raw_response = match raw_response {
            Ok(raw) => raw,
            Err(e) => return report.failed(e),
        };
        let record = self.fields.parse(&raw_response);
        report.raw_response = Some(raw_response);

        match record {
            Ok(record) => {
                let missing = record.missing_fields();
                if missing.is_empty() {
                    info!("Extracted complete record from {}", report.file_name);
                } else {
                    warn!("Record from {} is missing {:?}", report.file_name, missing);
                }
                report.record = Some(record);
                report
            }
            Err(e) => report.failed(e),
        }
    }

    /// Persist a confirmed record.
    pub fn save(&self, record: &InvoiceRecord) -> Result<AppendOutcome> {
        self.table.append(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ExtractionError, ServiceError};
    use crate::llm::{GenerationRequest, TextGenerator};
    use crate::models::config::{PdfConfig, ResponseFormat};
    use crate::ocr::OcrEngine;
    use crate::pdf::PdfRasterizer;
    use async_trait::async_trait;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Calls {
        ocr: Arc<AtomicUsize>,
        render: Arc<AtomicUsize>,
        generate: Arc<AtomicUsize>,
    }

    struct FixedOcr(Calls, &'static str);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn recognize(&self, _image: &DynamicImage) -> std::result::Result<String, ExtractionError> {
            self.0.ocr.fetch_add(1, Ordering::SeqCst);
            Ok(self.1.to_string())
        }
    }

    struct OnePage(Calls);

    #[async_trait]
    impl PdfRasterizer for OnePage {
        fn name(&self) -> &str {
            "one-page"
        }

        async fn render_pages(
            &self,
            _path: &Path,
            _dpi: u32,
            _max_pages: usize,
        ) -> std::result::Result<Vec<DynamicImage>, ExtractionError> {
            self.0.render.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DynamicImage::new_rgb8(2, 2)])
        }
    }

    struct Reply(Calls, Option<&'static str>);

    #[async_trait]
    impl TextGenerator for Reply {
        fn name(&self) -> &str {
            "reply"
        }

        async fn generate(&self, _request: &GenerationRequest) -> std::result::Result<String, ServiceError> {
            self.0.generate.fetch_add(1, Ordering::SeqCst);
            self.1
                .map(str::to_string)
                .ok_or(ServiceError::Transport("connection refused".to_string()))
        }
    }

    fn pipeline(dir: &tempfile::TempDir, reply: Option<&'static str>) -> (Pipeline, Calls) {
        let calls = Calls::default();
        let extractor = TextExtractor::new(
            Box::new(FixedOcr(calls.clone(), "INVOICE INV-001 total $150.00")),
            Box::new(OnePage(calls.clone())),
            PdfConfig::default(),
        );
        let fields = FieldExtractor::new(Box::new(Reply(calls.clone(), reply)), ResponseFormat::Lines);
        let table = RecordTable::new(dir.path().join("extracted_data/invoice_data.xlsx"), "Sheet1").unwrap();
        (Pipeline::new(extractor, fields, table), calls)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = InvexConfig::default();
        config.llm.timeout_secs = 0;
        let err = Pipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[tokio::test]
    async fn test_unsupported_upload_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = pipeline(&dir, Some("Invoice Number: 1"));

        let report = pipeline.process_upload("receipt.docx", b"PK\x03\x04".to_vec()).await;
        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::UnsupportedFormat));
        assert!(report.text.is_none());
        assert_eq!(calls.ocr.load(Ordering::SeqCst), 0);
        assert_eq!(calls.render.load(Ordering::SeqCst), 0);
        assert_eq!(calls.generate.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_flow_then_confirmed_save() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, calls) = pipeline(
            &dir,
            Some("Invoice Number: INV-001\nDate: 2024-03-01\nTotal Amount: $150.00"),
        );

        let report = pipeline.process_upload("invoice.pdf", crate::pdf::blank_pdf(1)).await;
        assert!(report.error.is_none());
        assert_eq!(report.text.as_ref().unwrap().text, "INVOICE INV-001 total $150.00");
        assert_eq!(calls.render.load(Ordering::SeqCst), 1);

        // Processing alone never writes the table.
        assert!(!pipeline.table().path().exists());

        let record = report.savable_record().unwrap().clone();
        assert_eq!(record, InvoiceRecord::new("INV-001", "2024-03-01", "$150.00"));

        let outcome = pipeline.save(&record).unwrap();
        assert_eq!(outcome.rows, 1);
        assert_eq!(pipeline.table().read_all().unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_unrecognized_reply_cannot_be_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(&dir, Some("Sorry, I can't read this."));

        let report = pipeline.process_upload("scan.png", png()).await;
        assert!(report.error.is_none());
        let record = report.record.clone().unwrap();
        assert!(record.is_empty());
        assert!(report.savable_record().is_none());

        let err = pipeline.save(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteRecord);
        assert!(!pipeline.table().path().exists());
    }

    #[tokio::test]
    async fn test_service_error_keeps_extracted_text() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(&dir, None);

        let report = pipeline.process_upload("scan.png", png()).await;
        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::ServiceError));
        assert!(report.text.is_some());
        assert!(report.raw_response.is_none());
        assert!(report.savable_record().is_none());
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_raw_response() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(&dir, Some("Invoice Number INV-7"));

        let report = pipeline.process_upload("scan.png", png()).await;
        assert_eq!(report.error.as_ref().map(|e| e.kind()), Some(ErrorKind::MalformedResponse));
        assert_eq!(report.raw_response.as_deref(), Some("Invoice Number INV-7"));
        assert!(report.record.is_none());
    }

    fn png() -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        data
    }
}
