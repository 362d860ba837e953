//! Parsing generation-service responses into invoice records.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::InvexError;
use crate::models::config::ResponseFormat;
use crate::models::invoice::{Field, InvoiceRecord};

lazy_static! {
    /// A whole response wrapped in a Markdown code fence.
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").unwrap();
}

/// Parse a response according to the format it was requested in.
///
/// JSON responses that fail to decode are parsed as labelled lines instead.
pub fn parse_response(response: &str, format: ResponseFormat) -> Result<InvoiceRecord, InvexError> {
    if format == ResponseFormat::Json {
        if let Some(record) = parse_json(response) {
            return Ok(record);
        }
        debug!("Response is not a JSON object, falling back to line parsing");
    }
    parse_labelled_lines(response)
}

/// Which field a response line describes, if any.
///
/// Checked in order: "Invoice Number", then "Date", then "Total Amount" or
/// "Amount". Matching is case-sensitive.
pub fn classify_line(line: &str) -> Option<Field> {
    if line.contains("Invoice Number") {
        Some(Field::InvoiceNumber)
    } else if line.contains("Date") {
        Some(Field::Date)
    } else if line.contains("Total Amount") || line.contains("Amount") {
        Some(Field::TotalAmount)
    } else {
        None
    }
}

/// Parse "Label: value" lines.
///
/// Each line sets at most one field; later lines overwrite earlier ones.
/// Lines naming no field are ignored. A line that names a field but has no
/// colon makes the whole response malformed.
pub fn parse_labelled_lines(response: &str) -> Result<InvoiceRecord, InvexError> {
    let mut record = InvoiceRecord::default();

    for line in response.lines() {
        let Some(field) = classify_line(line) else {
            continue;
        };
        let (label, value) = line.split_once(':').ok_or_else(|| InvexError::MalformedResponse {
            line: line.to_string(),
        })?;
        let value = clean_value(label, value);
        trace!("{} <- {:?}", field, value);
        record.set(field, value);
    }

    Ok(record)
}

/// Trim the value. When the label was opened in bold, as in `**Date:** 1 May`,
/// the closing `**` is dropped too. The value itself is kept as written.
fn clean_value<'a>(label: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if label.matches("**").count() % 2 == 1 {
        if let Some(rest) = value.strip_prefix("**") {
            return rest.trim();
        }
    }
    value
}

/// Decode a JSON object keyed by field labels.
///
/// Keys match labels ignoring case, spaces and underscores. Strings and
/// numbers are accepted; `null` and empty strings leave the field unset.
pub fn parse_json(response: &str) -> Option<InvoiceRecord> {
    let body = match CODE_FENCE.captures(response) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => response,
    };

    let Value::Object(map) = serde_json::from_str::<Value>(body.trim()).ok()? else {
        return None;
    };

    let mut record = InvoiceRecord::default();
    for (key, value) in &map {
        let Some(field) = Field::ALL.into_iter().find(|f| same_key(key, f.label())) else {
            continue;
        };
        let value = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !value.is_empty() {
            record.set(field, value);
        }
    }
    Some(record)
}

fn same_key(key: &str, label: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    };
    normalize(key) == normalize(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_scenario() {
        let record =
            parse_labelled_lines("Invoice Number: INV-001\nDate: 2024-03-01\nTotal Amount: $150.00").unwrap();
        assert_eq!(record, InvoiceRecord::new("INV-001", "2024-03-01", "$150.00"));
    }

    #[test]
    fn test_value_is_trimmed() {
        for value in ["X", "  padded  ", "A/B-12", "\twith tab"] {
            let record = parse_labelled_lines(&format!("Invoice Number: {value}\n")).unwrap();
            assert_eq!(record.invoice_number.as_deref(), Some(value.trim()));
        }
    }

    #[test]
    fn test_precedence_per_line() {
        // Mentions all three labels: Invoice Number wins.
        let record = parse_labelled_lines("Invoice Number and Date and Amount: 42").unwrap();
        assert_eq!(record.invoice_number.as_deref(), Some("42"));
        assert_eq!(record.date, None);
        assert_eq!(record.total_amount, None);

        // Date beats Amount.
        let record = parse_labelled_lines("Amount Date: 2024-01-01").unwrap();
        assert_eq!(record.date.as_deref(), Some("2024-01-01"));
        assert_eq!(record.total_amount, None);

        assert_eq!(classify_line("Due Amount: 5"), Some(Field::TotalAmount));
        assert_eq!(classify_line("Grand Total: 5"), None);
        assert_eq!(classify_line("invoice number: 5"), None);
    }

    #[test]
    fn test_unlabelled_lines_ignored() {
        let record = parse_labelled_lines("Here are the fields.\n\nVendor: ACME\n").unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_later_line_overwrites() {
        let record = parse_labelled_lines("Date: first\nDue Date: second").unwrap();
        assert_eq!(record.date.as_deref(), Some("second"));
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let record = parse_labelled_lines("Date: 2024-03-01 10:30").unwrap();
        assert_eq!(record.date.as_deref(), Some("2024-03-01 10:30"));
    }

    #[test]
    fn test_bold_label_emphasis_removed() {
        let record = parse_labelled_lines(
            "* **Invoice Number:** INV-9\n* **Date:** 1 May 2024\n* **Total Amount:** 12.00",
        )
        .unwrap();
        assert_eq!(record, InvoiceRecord::new("INV-9", "1 May 2024", "12.00"));
    }

    #[test]
    fn test_value_emphasis_is_kept() {
        let record = parse_labelled_lines("Invoice Number: *A17*\nDate: `2024-03-01`\nTotal Amount: $150.00*").unwrap();
        assert_eq!(record, InvoiceRecord::new("*A17*", "`2024-03-01`", "$150.00*"));

        let record = parse_labelled_lines("Invoice Number: `INV-3`").unwrap();
        assert_eq!(record.invoice_number.as_deref(), Some("`INV-3`"));

        // Only the bold closing the label is dropped.
        let record = parse_labelled_lines("**Invoice Number:** **A17**").unwrap();
        assert_eq!(record.invoice_number.as_deref(), Some("**A17**"));
    }

    #[test]
    fn test_matching_line_without_colon_is_malformed() {
        let err = parse_labelled_lines("Invoice Number: 1\nDate unknown").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(matches!(err, InvexError::MalformedResponse { ref line } if line == "Date unknown"));
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let response = "Invoice Number: 7\nBill Date: yesterday\nAmount: 3 EUR\nnoise";
        assert_eq!(
            parse_labelled_lines(response).unwrap(),
            parse_labelled_lines(response).unwrap()
        );
    }

    #[test]
    fn test_crlf_lines() {
        let record = parse_labelled_lines("Invoice Number: A\r\nDate: B\r\nTotal Amount: C\r\n").unwrap();
        assert_eq!(record, InvoiceRecord::new("A", "B", "C"));
    }

    #[test]
    fn test_json_response() {
        let record = parse_json(
            r#"{"Invoice Number": "INV-001", "date": "2024-03-01", "total_amount": 150.5, "Vendor": "x"}"#,
        )
        .unwrap();
        assert_eq!(record, InvoiceRecord::new("INV-001", "2024-03-01", "150.5"));
    }

    #[test]
    fn test_json_in_code_fence_with_nulls() {
        let record = parse_json("```json\n{\"Invoice Number\": \"A1\", \"Date\": null, \"Total Amount\": \"\"}\n```").unwrap();
        assert_eq!(record.invoice_number.as_deref(), Some("A1"));
        assert_eq!(record.missing_fields(), vec![Field::Date, Field::TotalAmount]);
    }

    #[test]
    fn test_json_format_falls_back_to_lines() {
        let record = parse_response("Invoice Number: 5\nDate: 6\nTotal Amount: 7", ResponseFormat::Json).unwrap();
        assert_eq!(record, InvoiceRecord::new("5", "6", "7"));

        assert!(parse_json("[1, 2]").is_none());
    }

    #[test]
    fn test_lines_format_does_not_decode_json() {
        let record = parse_response(r#"{"Invoice Number": "5"}"#, ResponseFormat::Lines);
        // The JSON line contains the label and a colon, so the line parser takes the raw remainder.
        assert_eq!(record.unwrap().invoice_number.as_deref(), Some("\"5\"}"));
    }
}
