//! TTPS shape: drops rows that cannot go into TTPS and attaches the
//! rotation, location and date window to the rest.

use crate::api::logs::{log_info, log_success};
use crate::models::context::DATE_FORMAT;
use crate::models::{OutputKind, OutputTable, RotationContext, RotationTable};
use crate::parser::columns::{DISCIPLINE, ELIGIBILITY, PRECEPTOR, SITE, STUDENTS};

use super::shape::{FieldTransform, OutputSchema};

/// Marker placed in the eligibility column of rows TTPS cannot accept.
pub const TTPS_SENTINEL: &str = "* Cannot Input into TTP *";

/// Result of the TTPS transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TtpsResult {
    pub output: OutputTable,
    /// Rows dropped because they carried the sentinel.
    pub excluded: usize,
}

/// Target columns, in order.
pub fn ttps_schema(context: &RotationContext) -> OutputSchema {
    OutputSchema::new()
        .field("Rotation", FieldTransform::from_constant(context.rotation_code.to_string()))
        .field("Location", FieldTransform::from_constant(context.location.code()))
        .field(
            "Start Date",
            FieldTransform::from_constant(context.start_date.format(DATE_FORMAT).to_string()),
        )
        .field(
            "End Date",
            FieldTransform::from_constant(context.end_date.format(DATE_FORMAT).to_string()),
        )
        .field(PRECEPTOR, FieldTransform::from_source(PRECEPTOR))
        .field(DISCIPLINE, FieldTransform::from_source(DISCIPLINE))
        .field(SITE, FieldTransform::from_source(SITE))
        .field(STUDENTS, FieldTransform::from_source(STUDENTS))
}

/// Whether row `row` of `table` may go into TTPS.
pub fn is_ttps_eligible(table: &RotationTable, row: usize) -> bool {
    table
        .get(row, ELIGIBILITY)
        .map_or(true, |cell| cell.display().trim() != TTPS_SENTINEL)
}

/// Shape a cleaned table for TTPS.
pub fn transform_ttps(table: &RotationTable, context: &RotationContext) -> TtpsResult {
    log_info(format!(
        "⚙️  TTPS transform: {} {} {}..{}",
        context.rotation_code, context.location, context.start_date, context.end_date
    ));

    let schema = ttps_schema(context);
    let shaped = schema.execute(table, |row| is_ttps_eligible(table, row));
    let excluded = table.row_count() - shaped.row_count();

    log_success(format!(
        "{} TTPS rows, {} marked \"{}\" omitted",
        shaped.row_count(),
        excluded,
        TTPS_SENTINEL
    ));

    TtpsResult {
        output: OutputTable::new(OutputKind::Ttps, shaped),
        excluded,
    }
}
