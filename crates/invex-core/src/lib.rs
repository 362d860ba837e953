//! Core library for invoice data capture.
//!
//! This crate provides:
//! - Text extraction from PDFs and images (Poppler rendering, Tesseract OCR)
//! - Invoice field extraction through a text-generation service (Gemini)
//! - An append-only record table (xlsx or csv) with a fixed header
//! - A pipeline wiring the three together, with saving left to the caller

pub mod error;
pub mod extract;
pub mod invoice;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod store;
mod tool;

pub use error::{ErrorKind, InvexError, Result};
pub use extract::{ExtractedText, TextExtractor, TextSource};
pub use invoice::{FieldExtraction, FieldExtractor};
pub use llm::{GeminiClient, GenerationRequest, TextGenerator};
pub use models::config::InvexConfig;
pub use models::document::{DocumentKind, UploadedDocument};
pub use models::invoice::{Field, InvoiceRecord};
pub use ocr::{OcrEngine, TesseractEngine};
pub use pdf::{PdfRasterizer, PopplerRasterizer};
pub use pipeline::{Pipeline, ProcessReport};
pub use store::{AppendOutcome, RecordTable, TableFormat};
