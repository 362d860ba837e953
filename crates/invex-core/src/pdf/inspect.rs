//! PDF sanity checks with lopdf and embedded-text extraction with pdf-extract.

use lopdf::Document;
use tracing::debug;

use crate::error::ExtractionError;

/// What we learned about a PDF before rendering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfInfo {
    /// Number of pages.
    pub page_count: u32,
    /// Whether the document was encrypted with an empty password.
    pub was_encrypted: bool,
}

/// Parse a PDF and count its pages.
///
/// Files lopdf cannot parse, files encrypted with a real password and files
/// without pages are all extraction errors. Only the last is final; the
/// rasterizer may still read the other two.
pub fn inspect(data: &[u8]) -> Result<PdfInfo, ExtractionError> {
    let mut doc = Document::load_mem(data).map_err(|e| ExtractionError::PdfParse(e.to_string()))?;

    let was_encrypted = doc.is_encrypted();
    if was_encrypted {
        if doc.decrypt("").is_err() {
            return Err(ExtractionError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(ExtractionError::NoPages);
    }

    debug!("Loaded PDF with {} pages", page_count);
    Ok(PdfInfo {
        page_count,
        was_encrypted,
    })
}

/// Extract the embedded text layer of a PDF, if any.
pub fn embedded_text(data: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(data).map_err(|e| ExtractionError::PdfParse(e.to_string()))
}

/// Build a minimal PDF with `pages` blank pages.
#[cfg(test)]
pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
    use lopdf::{Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}
