//! Invoice field extraction through a text-generation service.

mod parser;
pub mod prompt;

pub use parser::{classify_line, parse_json, parse_labelled_lines, parse_response};

use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::llm::{GeminiClient, TextGenerator};
use crate::models::config::{LlmConfig, ResponseFormat};
use crate::models::invoice::InvoiceRecord;

/// Result of field extraction.
#[derive(Debug, Clone, Serialize)]
pub struct FieldExtraction {
    /// The service's reply, verbatim.
    pub raw_response: String,
    /// Fields parsed from the reply; may be incomplete.
    pub record: InvoiceRecord,
}

/// Asks the generation service for invoice fields and parses its answer.
pub struct FieldExtractor {
    generator: Box<dyn TextGenerator>,
    format: ResponseFormat,
}

impl FieldExtractor {
    /// Create an extractor around any generator.
    pub fn new(generator: Box<dyn TextGenerator>, format: ResponseFormat) -> Self {
        Self { generator, format }
    }

    /// Create an extractor backed by Gemini.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = GeminiClient::from_config(config)?;
        Ok(Self::new(Box::new(client), config.response_format))
    }

    /// Send the text to the service and return its raw reply.
    pub async fn request(&self, text: &str) -> Result<String> {
        let start = Instant::now();
        let request = prompt::build_request(text, self.format);
        let response = self.generator.generate(&request).await?;
        info!(
            "{} replied with {} chars in {}ms",
            self.generator.name(),
            response.len(),
            start.elapsed().as_millis()
        );
        Ok(response)
    }

    /// Parse a raw reply into a record.
    pub fn parse(&self, response: &str) -> Result<InvoiceRecord> {
        parse_response(response, self.format)
    }

    /// Request and parse in one step.
    pub async fn extract(&self, text: &str) -> Result<FieldExtraction> {
        let raw_response = self.request(text).await?;
        let record = self.parse(&raw_response)?;
        Ok(FieldExtraction { raw_response, record })
    }
}
