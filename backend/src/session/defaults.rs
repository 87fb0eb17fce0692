//! Fallback values for the rotation form.
//!
//! When a previous value is absent or malformed the form falls back to a
//! fixed default rather than failing:
//!
//! | Field         | Fallback                                                   |
//! |---------------|------------------------------------------------------------|
//! | rotation      | `C1`                                                       |
//! | location      | `VGH` (second entry of `SMH, VGH, SPH`)                    |
//! | start/end     | today                                                      |
//! | academic year | current year; options `start-2 ..= start+1`, second-to-last selected |

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AcademicYear, Location, RotationCode};

use super::ContextForm;

pub const DEFAULT_LOCATION_INDEX: usize = 1;

/// Previous rotation if it parses, else `C1`.
pub fn default_rotation(preset: Option<&str>) -> RotationCode {
    preset
        .and_then(|p| p.parse().ok())
        .unwrap_or(RotationCode::FALLBACK)
}

/// Previous location if it is one of the known sites, else `VGH`.
pub fn default_location(preset: Option<&str>) -> Location {
    preset
        .and_then(|p| p.parse().ok())
        .unwrap_or(Location::ALL[DEFAULT_LOCATION_INDEX])
}

/// Academic-year options offered to the user and the one preselected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcademicYearChoice {
    pub options: Vec<AcademicYear>,
    pub selected: usize,
}

impl AcademicYearChoice {
    pub fn selected_year(&self) -> AcademicYear {
        self.options[self.selected]
    }
}

/// Build the academic-year choice around the previous value.
///
/// The start year is read from the left of the dash; if that fails the
/// current year is used. The previous value stays selected only when it
/// is exactly one of the offered options.
pub fn academic_year_choice(preset: Option<&str>, current_year: i32) -> AcademicYearChoice {
    // keep the whole window start-2 ..= start+1 inside the supported years
    let lowest = AcademicYear::START_YEARS.start() + 2;
    let highest = AcademicYear::START_YEARS.end() - 1;
    let window = lowest..=highest;

    let current_year = current_year.clamp(lowest, highest);
    let preset = preset.map(str::to_string).unwrap_or_else(|| {
        AcademicYear::starting(current_year)
            .map(|y| y.to_string())
            .unwrap_or_default()
    });

    let preset_start = preset
        .split('-')
        .next()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .filter(|start| window.contains(start))
        .unwrap_or(current_year);

    let options: Vec<AcademicYear> = (preset_start - 2..preset_start + 2)
        .filter_map(|y| AcademicYear::starting(y).ok())
        .collect();

    let selected = options
        .iter()
        .position(|y| y.to_string() == preset)
        .unwrap_or(options.len().saturating_sub(2));

    AcademicYearChoice { options, selected }
}

/// Every form field resolved to a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefaults {
    pub rotation: RotationCode,
    pub rotation_letters: [char; 4],
    pub rotation_numbers: [u8; 6],
    pub location: Location,
    pub locations: [Location; 3],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub academic_year: AcademicYearChoice,
}

impl FormDefaults {
    /// Resolve defaults from the previous form values.
    pub fn resolve(form: &ContextForm, today: NaiveDate) -> Self {
        use chrono::Datelike;

        Self {
            rotation: default_rotation(form.rotation.as_deref()),
            rotation_letters: RotationCode::LETTERS,
            rotation_numbers: RotationCode::NUMBERS,
            location: default_location(form.location.as_deref()),
            locations: Location::ALL,
            start_date: form.start_date.unwrap_or(today),
            end_date: form.end_date.unwrap_or(today),
            academic_year: academic_year_choice(form.academic_year.as_deref(), today.year()),
        }
    }

    /// A fully populated form built from these defaults.
    pub fn to_form(&self) -> ContextForm {
        ContextForm {
            rotation: Some(self.rotation.to_string()),
            location: Some(self.location.to_string()),
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
            academic_year: Some(self.academic_year.selected_year().to_string()),
        }
    }
}
