//! One45 shape: people-centric rows with split names and no rotation context.

use crate::api::logs::log_success;
use crate::models::{OutputKind, OutputTable, RotationTable};
use crate::parser::columns::{DISCIPLINE, EMAIL, PRECEPTOR, SITE, STUDENTS};

use super::shape::{FieldTransform, Operation, OutputSchema};

pub fn one45_schema() -> OutputSchema {
    OutputSchema::new()
        .field(
            "Last Name",
            FieldTransform::from_source(PRECEPTOR).with_operation(Operation::LastName),
        )
        .field(
            "First Name",
            FieldTransform::from_source(PRECEPTOR).with_operation(Operation::FirstName),
        )
        .field(EMAIL, FieldTransform::from_source(EMAIL))
        .field(DISCIPLINE, FieldTransform::from_source(DISCIPLINE))
        .field(SITE, FieldTransform::from_source(SITE))
        .field(STUDENTS, FieldTransform::from_source(STUDENTS))
}

/// Shape a cleaned table for One45. Row count is preserved.
pub fn transform_one45(table: &RotationTable) -> OutputTable {
    let shaped = one45_schema().execute(table, |_| true);
    log_success(format!("⚙️  One45 transform: {} rows", shaped.row_count()));
    OutputTable::new(OutputKind::One45, shaped)
}
