//! CSV tables.

use std::path::Path;

use crate::error::StorageError;
use crate::models::invoice::Field;

use super::Row;

pub(super) fn encode(rows: &[Row]) -> Result<Vec<u8>, StorageError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(Field::header())?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner().map_err(|e| StorageError::Io(e.into_error()))
}

pub(super) fn decode(path: &Path) -> Result<Vec<Vec<String>>, StorageError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
