//! xlsx tables: calamine for reading, rust_xlsxwriter for writing.

use std::path::Path;

use calamine::{Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::StorageError;
use crate::models::invoice::Field;

use super::Row;

const COLUMN_WIDTH: f64 = 22.0;

/// Encode header plus rows as a single-sheet workbook.
pub(super) fn encode(rows: &[Row], sheet_name: &str) -> Result<Vec<u8>, StorageError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, label) in Field::header().iter().enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, COLUMN_WIDTH)?;
            worksheet.write_string_with_format(0, col, *label, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let row_index = (i + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                worksheet.write_string(row_index, col as u16, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Read every row of the named sheet, or the first sheet if it is absent.
pub(super) fn decode(path: &Path, sheet_name: &str) -> Result<Vec<Vec<String>>, StorageError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| StorageError::XlsxRead(format!("could not open {}: {}", path.display(), e)))?;

    let range = if workbook.sheet_names().iter().any(|name| name == sheet_name) {
        workbook.worksheet_range(sheet_name)
    } else {
        workbook
            .worksheet_range_at(0)
            .ok_or_else(|| StorageError::XlsxRead(format!("{} has no worksheets", path.display())))?
    }
    .map_err(|e| StorageError::XlsxRead(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}
