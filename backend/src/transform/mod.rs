//! Transformation module.
//!
//! This module handles everything between extraction and display:
//! - Clean: post-edit normalization
//! - Insert: blank-row insertion for the editor
//! - Shape: column-mapping executor shared by the output shapes
//! - TTPS, Tracker, One45: the three output shapes

pub mod clean;
pub mod insert;
pub mod one45;
pub mod shape;
pub mod tracker;
pub mod ttps;

pub use clean::clean;
pub use insert::{insert_blank_rows, MAX_INSERT_ROWS};
pub use one45::transform_one45;
pub use shape::{FieldTransform, Operation, OutputSchema};
pub use tracker::transform_tracker;
pub use ttps::{transform_ttps, TtpsResult, TTPS_SENTINEL};

use crate::error::ContextError;
use crate::models::{OutputKind, OutputTable, RotationContext, RotationTable};

/// Clean `table` and shape it for `kind`.
///
/// TTPS and tracker need a context; calling them without one is a
/// `ContextError::Missing`.
pub fn clean_and_shape(
    kind: OutputKind,
    table: &RotationTable,
    context: Option<&RotationContext>,
) -> Result<OutputTable, ContextError> {
    let cleaned = clean(table);
    match (kind, context) {
        (OutputKind::One45, _) => Ok(transform_one45(&cleaned)),
        (OutputKind::Ttps, Some(ctx)) => Ok(transform_ttps(&cleaned, ctx).output),
        (OutputKind::Tracker, Some(ctx)) => Ok(transform_tracker(&cleaned, ctx)),
        (_, None) => Err(ContextError::Missing("rotation context")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn test_clean_and_shape_without_context() {
        let table = RotationTable::new(
            vec!["Preceptor".into()],
            vec![vec![Cell::text(" Dr. A ")], vec![Cell::Blank]],
        );
        let one45 = clean_and_shape(OutputKind::One45, &table, None).unwrap();
        assert_eq!(one45.table.row_count(), 1);

        let err = clean_and_shape(OutputKind::Ttps, &table, None).unwrap_err();
        assert_eq!(err, ContextError::Missing("rotation context"));
    }
}
