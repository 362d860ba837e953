//! Invoice record model: the three fields pulled out of a document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed record fields, in table column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Invoice Number")]
    InvoiceNumber,
    #[serde(rename = "Date")]
    Date,
    #[serde(rename = "Total Amount")]
    TotalAmount,
}

impl Field {
    /// All fields in column order.
    pub const ALL: [Field; 3] = [Field::InvoiceNumber, Field::Date, Field::TotalAmount];

    /// Column header / response label for this field.
    pub fn label(&self) -> &'static str {
        match self {
            Field::InvoiceNumber => "Invoice Number",
            Field::Date => "Date",
            Field::TotalAmount => "Total Amount",
        }
    }

    /// Fixed table header.
    pub fn header() -> [&'static str; 3] {
        Self::ALL.map(|f| f.label())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Invoice fields extracted from a document.
///
/// Any field may be absent; only complete records may be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(rename = "Invoice Number", default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(rename = "Total Amount", default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
}

impl InvoiceRecord {
    /// Create a record with all three fields set.
    pub fn new(
        invoice_number: impl Into<String>,
        date: impl Into<String>,
        total_amount: impl Into<String>,
    ) -> Self {
        Self {
            invoice_number: Some(invoice_number.into()),
            date: Some(date.into()),
            total_amount: Some(total_amount.into()),
        }
    }

    /// Get a field value.
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::InvoiceNumber => self.invoice_number.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::TotalAmount => self.total_amount.as_deref(),
        }
    }

    /// Set a field value, replacing any previous one.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::InvoiceNumber => &mut self.invoice_number,
            Field::Date => &mut self.date,
            Field::TotalAmount => &mut self.total_amount,
        };
        *slot = Some(value.into());
    }

    /// Fields that are absent or blank, in column order.
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    /// True when every field is present and non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// True when no field is set at all.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Values in column order; absent fields become empty strings.
    pub fn to_row(&self) -> [String; 3] {
        Field::ALL.map(|f| self.get(f).unwrap_or_default().to_string())
    }

    /// Build a record from a table row in column order.
    ///
    /// Empty cells are treated as absent. Cells beyond the third are ignored.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Self {
        let mut record = Self::default();
        for (field, cell) in Field::ALL.iter().zip(row) {
            let cell = cell.as_ref();
            if !cell.is_empty() {
                record.set(*field, cell);
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_order() {
        assert_eq!(Field::header(), ["Invoice Number", "Date", "Total Amount"]);
    }

    #[test]
    fn test_missing_fields() {
        let mut record = InvoiceRecord::default();
        assert!(record.is_empty());
        assert_eq!(record.missing_fields(), Field::ALL.to_vec());

        record.set(Field::Date, "2024-03-01");
        record.set(Field::TotalAmount, "   ");
        assert_eq!(record.missing_fields(), vec![Field::InvoiceNumber, Field::TotalAmount]);
        assert!(!record.is_complete());

        record.set(Field::InvoiceNumber, "INV-001");
        record.set(Field::TotalAmount, "$150.00");
        assert!(record.is_complete());
    }

    #[test]
    fn test_serializes_with_labels() {
        let record = InvoiceRecord::new("INV-001", "2024-03-01", "$150.00");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Invoice Number": "INV-001",
                "Date": "2024-03-01",
                "Total Amount": "$150.00"
            })
        );

        let partial = InvoiceRecord { date: Some("today".into()), ..Default::default() };
        assert_eq!(serde_json::to_string(&partial).unwrap(), r#"{"Date":"today"}"#);
    }

    #[test]
    fn test_row_conversion() {
        let record = InvoiceRecord::new("A-1", "1 Jan", "10");
        assert_eq!(InvoiceRecord::from_row(&record.to_row()), record);

        let partial = InvoiceRecord::from_row(&["A-2", ""]);
        assert_eq!(partial.invoice_number.as_deref(), Some("A-2"));
        assert_eq!(partial.date, None);
        assert_eq!(partial.total_amount, None);
    }
}
