//! Record table: the spreadsheet that accumulates one row per saved invoice.

mod delimited;
mod workbook;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{InvexError, Result, StorageError};
use crate::models::config::StorageConfig;
use crate::models::invoice::{Field, InvoiceRecord};

/// A table row in column order.
pub(crate) type Row = [String; 3];

/// On-disk table format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    Xlsx,
    Csv,
}

impl TableFormat {
    /// Pick the format for a table path.
    pub fn from_path(path: &Path) -> std::result::Result<Self, StorageError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "xlsx" => Ok(TableFormat::Xlsx),
            "csv" => Ok(TableFormat::Csv),
            _ => Err(StorageError::UnsupportedTable(path.display().to_string())),
        }
    }
}

/// Outcome of a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Table file written.
    pub path: PathBuf,
    /// Data rows in the table after the append.
    pub rows: usize,
    /// Whether the table was created by this append.
    pub created: bool,
}

/// Append-only table of invoice records with a fixed header.
#[derive(Debug, Clone)]
pub struct RecordTable {
    path: PathBuf,
    format: TableFormat,
    sheet_name: String,
}

impl RecordTable {
    /// Open (without touching the file) the table at `path`.
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let format = TableFormat::from_path(&path)?;
        Ok(Self {
            path,
            format,
            sheet_name: sheet_name.into(),
        })
    }

    /// Open the table described by the configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.table_path, &config.sheet_name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record in file order. A missing table is empty.
    pub fn read_all(&self) -> Result<Vec<InvoiceRecord>> {
        Ok(self
            .read_rows()?
            .iter()
            .map(|row| InvoiceRecord::from_row(row))
            .collect())
    }

    /// Append a complete record as the last row.
    ///
    /// Incomplete records are rejected before the table is opened.
    pub fn append(&self, record: &InvoiceRecord) -> Result<AppendOutcome> {
        let missing = record.missing_fields();
        if !missing.is_empty() {
            return Err(InvexError::IncompleteRecord { missing });
        }

        let created = !self.path.exists();
        let mut rows = if created { Vec::new() } else { self.read_rows()? };
        rows.push(record.to_row());

        let bytes = match self.format {
            TableFormat::Xlsx => workbook::encode(&rows, &self.sheet_name)?,
            TableFormat::Csv => delimited::encode(&rows)?,
        };
        write_atomically(&self.path, &bytes)?;

        info!(
            "Saved invoice {} to {} ({} rows)",
            record.get(Field::InvoiceNumber).unwrap_or_default(),
            self.path.display(),
            rows.len()
        );

        Ok(AppendOutcome {
            path: self.path.clone(),
            rows: rows.len(),
            created,
        })
    }

    fn read_rows(&self) -> std::result::Result<Vec<Row>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = match self.format {
            TableFormat::Xlsx => workbook::decode(&self.path, &self.sheet_name)?,
            TableFormat::Csv => delimited::decode(&self.path)?,
        };
        debug!("Read {} raw rows from {}", raw.len(), self.path.display());
        data_rows(raw)
    }
}

/// Check the header and convert the remaining non-blank rows.
fn data_rows(raw: Vec<Vec<String>>) -> std::result::Result<Vec<Row>, StorageError> {
    let mut rows = raw
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut found = header;
    while found.last().is_some_and(|cell| cell.is_empty()) {
        found.pop();
    }
    let expected = Field::header();
    if found != expected {
        return Err(StorageError::HeaderMismatch {
            expected: expected.map(str::to_string).to_vec(),
            found,
        });
    }

    Ok(rows
        .map(|row| {
            let mut cells = row.into_iter();
            std::array::from_fn(|_| cells.next().unwrap_or_default())
        })
        .collect())
}

/// Replace `path` with `bytes` via a temporary file in the same directory.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::result::Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn table(dir: &tempfile::TempDir, name: &str) -> RecordTable {
        RecordTable::new(dir.path().join(name), "Sheet1").unwrap()
    }

    #[test]
    fn test_round_trip_single_record() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["out/invoice_data.xlsx", "out/invoice_data.csv"] {
            let table = table(&dir, name);
            let record = InvoiceRecord::new("INV-001", "2024-03-01", "$150.00");

            let outcome = table.append(&record).unwrap();
            assert!(outcome.created);
            assert_eq!(outcome.rows, 1);

            assert_eq!(table.read_all().unwrap(), vec![record], "{name}");
        }
    }

    #[test]
    fn test_appends_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["t.xlsx", "t.csv"] {
            let table = table(&dir, name);
            let records: Vec<_> = (1..=3)
                .map(|i| InvoiceRecord::new(format!("INV-{i}"), format!("2024-01-0{i}"), format!("{i}0.00")))
                .collect();
            for record in &records {
                table.append(record).unwrap();
            }
            let outcome = table.append(&records[0]).unwrap();
            assert!(!outcome.created);
            assert_eq!(outcome.rows, 4);

            let mut expected = records.clone();
            expected.push(records[0].clone());
            assert_eq!(table.read_all().unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn test_incomplete_record_leaves_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["t.xlsx", "t.csv"] {
            let table = table(&dir, name);
            table.append(&InvoiceRecord::new("A", "B", "C")).unwrap();
            let before = fs::read(table.path()).unwrap();

            let incomplete = InvoiceRecord {
                invoice_number: Some("X".into()),
                date: Some(" ".into()),
                total_amount: None,
            };
            let err = table.append(&incomplete).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::IncompleteRecord);
            assert!(matches!(err, InvexError::IncompleteRecord { ref missing } if *missing == vec![Field::Date, Field::TotalAmount]));

            assert_eq!(fs::read(table.path()).unwrap(), before);
        }
    }

    #[test]
    fn test_incomplete_record_does_not_create_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = table(&dir, "new/t.xlsx");
        let err = table.append(&InvoiceRecord::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteRecord);
        assert!(!table.path().exists());
        assert!(!dir.path().join("new").exists());
    }

    #[test]
    fn test_header_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, "Number,Date,Total\n1,2,3\n").unwrap();
        let table = RecordTable::new(&path, "Sheet1").unwrap();

        let err = table.append(&InvoiceRecord::new("A", "B", "C")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Number,Date,Total\n1,2,3\n");
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(table(&dir, "none.xlsx").read_all().unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_table_extension() {
        let err = RecordTable::new("data/out.json", "Sheet1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageError);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let rows = data_rows(vec![
            vec!["Invoice Number".into(), "Date".into(), "Total Amount".into(), "".into()],
            vec!["".into(), "".into(), "".into()],
            vec!["A".into(), "B".into()],
        ])
        .unwrap();
        assert_eq!(rows, vec![["A".to_string(), "B".to_string(), String::new()]]);
    }
}
