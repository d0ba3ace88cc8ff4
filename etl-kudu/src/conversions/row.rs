use std::collections::HashMap;

use tracing::{debug, error};

use crate::client::PartialRow;
use crate::conversions::coerce::{Coercion, coerce_value};
use crate::types::{ColumnSchema, RowData};

/// What happened while filling one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFill {
    /// Columns set on the row, nulls included.
    pub set: usize,
    /// Source columns absent from the target schema.
    pub unknown: usize,
    /// Columns left unset because of a coercion error or an unhandled type.
    pub unset: usize,
    /// Whether filling stopped early on an invalid boolean.
    pub aborted: bool,
}

/// Copies the columns of `data` into `row`, coercing each value to its target column type.
///
/// `columns` maps lowercased column names to the target schema. Source columns missing from
/// the schema are skipped. Columns listed in `encryption_columns` (case-insensitive) are
/// hashed before coercion.
pub fn fill_row(
    row: &mut PartialRow,
    data: &RowData,
    columns: &HashMap<String, &ColumnSchema>,
    encryption_columns: &[String],
    table: &str,
) -> RowFill {
    let mut fill = RowFill::default();

    for (name, raw) in data.iter() {
        let Some(column) = columns.get(&name.to_lowercase()) else {
            debug!(table, column = name, "column is not in the kudu schema, skipping");
            fill.unknown += 1;
            continue;
        };

        let encrypted = encryption_columns
            .iter()
            .any(|encrypted| encrypted.eq_ignore_ascii_case(name));

        match coerce_value(raw, column.column_type, encrypted) {
            Coercion::Set(value) => {
                row.set(column.name.clone(), value);
                fill.set += 1;
            }
            Coercion::Unset(err) => {
                error!(
                    table,
                    column = %column.name,
                    column_type = %column.column_type,
                    value = %raw,
                    error = %err,
                    "failed to convert column value, leaving column unset"
                );
                fill.unset += 1;
            }
            Coercion::AbortRow(err) => {
                error!(
                    table,
                    column = %column.name,
                    column_type = %column.column_type,
                    value = %raw,
                    error = %err,
                    "invalid boolean value, remaining columns of the row are left unset"
                );
                fill.unset += 1;
                fill.aborted = true;
                break;
            }
            Coercion::Skip => {
                error!(
                    table,
                    column = %column.name,
                    column_type = %column.column_type,
                    "unsupported kudu column type, leaving column unset"
                );
                fill.unset += 1;
            }
        }
    }

    fill
}
