//! Strict decoding of a CSV catalog answer.
//!
//! The header line is checked before any row is read:
//! - every requested column (and `source_id`) must be present, otherwise
//!   [`HrError::MissingColumn`];
//! - every column must be a known [`CatalogField`], otherwise [`HrError::UnexpectedColumn`].
//!
//! Rows are then deserialized with serde into [`CatalogRecord`]. Empty cells become `None`,
//! non-finite numbers are dropped to `None`, and any unparsable cell aborts the decoding with
//! [`HrError::MalformedRow`] (no partial result).
use csv::{ReaderBuilder, Trim};

use super::{CatalogField, CatalogRecord, RawResultSet};
use crate::hr_errors::HrError;

pub(crate) fn decode_catalog_csv(
    body: &str,
    fields: &[CatalogField],
) -> Result<RawResultSet, HrError> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let headers = csv_reader.headers().map_err(|e| HrError::MalformedRow {
        row: 0,
        message: e.to_string(),
    })?;

    let columns = headers
        .iter()
        .map(|name| {
            name.parse::<CatalogField>()
                .map_err(|_| HrError::UnexpectedColumn(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for expected in std::iter::once(&CatalogField::SourceId).chain(fields) {
        if !columns.contains(expected) {
            return Err(HrError::MissingColumn(expected.column_name().to_string()));
        }
    }

    let records = csv_reader
        .deserialize::<CatalogRecord>()
        .map(|row| {
            row.map(CatalogRecord::drop_non_finite)
                .map_err(|e| HrError::MalformedRow {
                    row: e.position().map(|p| p.record()).unwrap_or_default(),
                    message: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawResultSet::new(records))
}
