//! Error types for the invex-core library.

use std::fmt;

use thiserror::Error;

use crate::models::invoice::Field;

/// Main error type for the invex library.
///
/// Every variant is terminal for the request that produced it. Front ends
/// render the message and keep accepting new uploads.
#[derive(Error, Debug)]
pub enum InvexError {
    /// The uploaded file's extension is not one we can extract text from.
    #[error("unsupported file format: {0} (use a PDF, JPG, JPEG or PNG file)")]
    UnsupportedFormat(String),

    /// Text extraction (rendering or OCR) failed.
    #[error("error extracting text: {0}")]
    Extraction(#[from] ExtractionError),

    /// The text-generation service call failed.
    #[error("generation service error: {0}")]
    Service(#[from] ServiceError),

    /// A labelled line in the service response could not be split into a value.
    #[error("malformed service response: line {line:?} has no ':' separator")]
    MalformedResponse { line: String },

    /// The record is missing one or more required fields.
    #[error("incomplete record: missing {}", FieldList(.missing))]
    IncompleteRecord { missing: Vec<Field> },

    /// Reading or writing the record table failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Stable tag for an [`InvexError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    ExtractionError,
    ServiceError,
    MalformedResponse,
    IncompleteRecord,
    StorageError,
    ConfigError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::ExtractionError => "ExtractionError",
            ErrorKind::ServiceError => "ServiceError",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::IncompleteRecord => "IncompleteRecord",
            ErrorKind::StorageError => "StorageError",
            ErrorKind::ConfigError => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InvexError {
    /// Get the taxonomy tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvexError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            InvexError::Extraction(_) => ErrorKind::ExtractionError,
            InvexError::Service(_) => ErrorKind::ServiceError,
            InvexError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            InvexError::IncompleteRecord { .. } => ErrorKind::IncompleteRecord,
            InvexError::Storage(_) => ErrorKind::StorageError,
            InvexError::Config(_) => ErrorKind::ConfigError,
        }
    }
}

/// Errors raised while turning a document into text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    PdfParse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The rasterizer produced no page images.
    #[error("rendering produced no page images")]
    NoRenderedPages,

    /// An external tool could not be started.
    #[error("could not run {tool}: {reason} (is it installed and on PATH?)")]
    ToolMissing { tool: String, reason: String },

    /// An external tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// An external tool did not finish in time.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error (temporary files, reading rendered pages).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the text-generation service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No API credential was configured.
    #[error("no API key configured (set {env_var} or llm.api_key)")]
    MissingCredential { env_var: String },

    /// Transport-level failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-success HTTP status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response envelope could not be decoded.
    #[error("failed to decode service response: {0}")]
    Decode(String),

    /// The service returned no usable text.
    #[error("service returned no text{}", .reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyResponse { reason: Option<String> },
}

/// Errors related to the record table.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write the xlsx workbook.
    #[error("failed to write workbook: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Failed to read the xlsx workbook.
    #[error("failed to read workbook: {0}")]
    XlsxRead(String),

    /// CSV encode/decode error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The existing table has a different header.
    #[error("table header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// The table path has an extension we cannot store to.
    #[error("unsupported table file {0} (use .xlsx or .csv)")]
    UnsupportedTable(String),
}

struct FieldList<'a>(&'a [Field]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.0.iter().map(|field| field.label()).collect();
        f.write_str(&labels.join(", "))
    }
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
