//! Instructions sent to the generation service alongside the invoice text.

use crate::llm::GenerationRequest;
use crate::models::config::ResponseFormat;

const FIELD_DESCRIPTION: &str = "\
Extract the following fields from the invoice text:
- Invoice Number (may be labelled Invoice No, Bill Number, or similar).
- Date (may be labelled Invoice Date, Bill Date, or similar).
- Total Amount (or Amount), which may appear as Total, Grand Total, Subtotal, or Due Amount.
";

const LINES_FORMAT: &str = "\
Only return the fields Invoice Number, Date and Total Amount, one per line, \
each written as the field name, a colon, and the value. Ignore any other information.

Invoice Text:
";

const JSON_FORMAT: &str = "\
Return only a JSON object with exactly the keys \"Invoice Number\", \"Date\" and \
\"Total Amount\", each mapped to the value as a string, or null when the field is \
not present. Do not add any other keys or commentary.

Invoice Text:
";

/// Build the instruction for the requested response format.
pub fn instruction(format: ResponseFormat) -> String {
    let format_text = match format {
        ResponseFormat::Lines => LINES_FORMAT,
        ResponseFormat::Json => JSON_FORMAT,
    };
    format!("{FIELD_DESCRIPTION}\n{format_text}")
}

/// Build the generation request: the invoice text first, then the instruction.
pub fn build_request(text: &str, format: ResponseFormat) -> GenerationRequest {
    GenerationRequest {
        parts: vec![text.to_string(), instruction(format)],
        response_mime_type: match format {
            ResponseFormat::Lines => None,
            ResponseFormat::Json => Some("application/json".to_string()),
        },
        temperature: Some(0.0),
    }
}
