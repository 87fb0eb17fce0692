//! Blank-row insertion used by the editor.

use crate::error::RangeError;
use crate::models::RotationTable;

/// Largest number of rows one insertion may add.
pub const MAX_INSERT_ROWS: usize = 100;

/// Splice `count` blank rows into `table` at `index`.
///
/// `index` may equal the row count (append). Bounds are checked before
/// anything is built, so a rejected call leaves nothing half-done.
pub fn insert_blank_rows(
    table: &RotationTable,
    index: usize,
    count: usize,
) -> Result<RotationTable, RangeError> {
    let max = table.row_count();
    if index > max {
        return Err(RangeError::Index { index, max });
    }
    if count == 0 || count > MAX_INSERT_ROWS {
        return Err(RangeError::Count {
            count,
            max: MAX_INSERT_ROWS,
        });
    }

    let (columns, rows) = table.clone().into_parts();
    let blank = table.blank_row();
    let mut spliced = Vec::with_capacity(rows.len() + count);
    let mut rows = rows.into_iter();

    spliced.extend(rows.by_ref().take(index));
    spliced.extend(std::iter::repeat(blank).take(count));
    spliced.extend(rows);

    Ok(RotationTable::new(columns, spliced))
}
