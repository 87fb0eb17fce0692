//! Internal tracker shape: every row, keyed by academic year, rotation and
//! location.

use crate::api::logs::log_success;
use crate::models::{OutputKind, OutputTable, RotationContext, RotationTable};
use crate::parser::columns::{DISCIPLINE, EMAIL, NOTES, PRECEPTOR, SITE, STUDENTS};

use super::shape::{FieldTransform, OutputSchema};

pub fn tracker_schema(context: &RotationContext) -> OutputSchema {
    OutputSchema::new()
        .field(
            "Academic Year",
            FieldTransform::from_constant(context.academic_year.to_string()),
        )
        .field("Rotation", FieldTransform::from_constant(context.rotation_code.to_string()))
        .field("Location", FieldTransform::from_constant(context.location.code()))
        .field(PRECEPTOR, FieldTransform::from_source(PRECEPTOR))
        .field(EMAIL, FieldTransform::from_source(EMAIL))
        .field(DISCIPLINE, FieldTransform::from_source(DISCIPLINE))
        .field(SITE, FieldTransform::from_source(SITE))
        .field(STUDENTS, FieldTransform::from_source(STUDENTS))
        .field(NOTES, FieldTransform::from_source(NOTES))
}

/// Shape a cleaned table for the internal tracker. No rows are filtered.
pub fn transform_tracker(table: &RotationTable, context: &RotationContext) -> OutputTable {
    let shaped = tracker_schema(context).execute(table, |_| true);
    log_success(format!(
        "⚙️  Tracker transform: {} rows for {} {} {}",
        shaped.row_count(),
        context.academic_year,
        context.rotation_code,
        context.location
    ));
    OutputTable::new(OutputKind::Tracker, shaped)
}
