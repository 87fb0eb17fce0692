//! Rotation context: the per-session values attached to TTPS and tracker rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ContextError, ContextResult};

/// Date format used for context dates and rendered date columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> ContextResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ContextError::Date(value.to_string()))
}

// =============================================================================
// Rotation Code
// =============================================================================

/// Block letter (A-D) plus block number (1-6), e.g. `C1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RotationCode {
    letter: char,
    number: u8,
}

impl RotationCode {
    pub const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];
    pub const NUMBERS: [u8; 6] = [1, 2, 3, 4, 5, 6];

    /// Used when no usable rotation was supplied.
    pub const FALLBACK: RotationCode = RotationCode {
        letter: 'C',
        number: 1,
    };

    pub fn new(letter: char, number: u8) -> ContextResult<Self> {
        let letter = letter.to_ascii_uppercase();
        if Self::LETTERS.contains(&letter) && Self::NUMBERS.contains(&number) {
            Ok(Self { letter, number })
        } else {
            Err(ContextError::RotationCode(format!("{}{}", letter, number)))
        }
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn number(&self) -> u8 {
        self.number
    }
}

impl FromStr for RotationCode {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(letter), Some(digit), None) => digit
                .to_digit(10)
                .ok_or_else(|| ContextError::RotationCode(s.to_string()))
                .and_then(|n| Self::new(letter, n as u8))
                .map_err(|_| ContextError::RotationCode(s.to_string())),
            _ => Err(ContextError::RotationCode(s.to_string())),
        }
    }
}

impl TryFrom<String> for RotationCode {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RotationCode> for String {
    fn from(code: RotationCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for RotationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

// =============================================================================
// Location
// =============================================================================

/// Hospital site code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Location {
    Smh,
    Vgh,
    Sph,
}

impl Location {
    /// Selection order offered to users.
    pub const ALL: [Location; 3] = [Location::Smh, Location::Vgh, Location::Sph];

    pub fn code(&self) -> &'static str {
        match self {
            Location::Smh => "SMH",
            Location::Vgh => "VGH",
            Location::Sph => "SPH",
        }
    }
}

impl FromStr for Location {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|loc| loc.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ContextError::Location(s.to_string()))
    }
}

impl TryFrom<String> for Location {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.code().to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Academic Year
// =============================================================================

/// Academic year spanning two calendar years, rendered `YYYY-YYYY+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    /// Supported start years; both years must fit in four digits.
    pub const START_YEARS: std::ops::RangeInclusive<i32> = 1..=9998;

    pub fn starting(start: i32) -> ContextResult<Self> {
        if Self::START_YEARS.contains(&start) {
            Ok(Self { start })
        } else {
            Err(ContextError::AcademicYear(start.to_string()))
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }

    pub fn end_year(&self) -> i32 {
        self.start + 1
    }
}

impl FromStr for AcademicYear {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ContextError::AcademicYear(s.to_string());
        let (left, right) = s.trim().split_once('-').ok_or_else(err)?;
        let four_digits = |part: &str| part.len() == 4 && part.bytes().all(|b| b.is_ascii_digit());
        if !four_digits(left) || !four_digits(right) {
            return Err(err());
        }
        let start: i32 = left.parse().map_err(|_| err())?;
        let end: i32 = right.parse().map_err(|_| err())?;
        if end != start + 1 {
            return Err(err());
        }
        Self::starting(start).map_err(|_| err())
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AcademicYear> for String {
    fn from(year: AcademicYear) -> Self {
        year.to_string()
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.start + 1)
    }
}

// =============================================================================
// Rotation Context
// =============================================================================

/// Values supplied once per session and attached to TTPS and tracker rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationContext {
    pub rotation_code: RotationCode,
    pub location: Location,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub academic_year: AcademicYear,
}

impl RotationContext {
    /// Build a context, rejecting an end date before the start date.
    pub fn new(
        rotation_code: RotationCode,
        location: Location,
        start_date: NaiveDate,
        end_date: NaiveDate,
        academic_year: AcademicYear,
    ) -> ContextResult<Self> {
        if end_date < start_date {
            return Err(ContextError::DateOrder {
                start: start_date.format(DATE_FORMAT).to_string(),
                end: end_date.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self {
            rotation_code,
            location,
            start_date,
            end_date,
            academic_year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_code_parse() {
        let code: RotationCode = "C1".parse().unwrap();
        assert_eq!(code.letter(), 'C');
        assert_eq!(code.number(), 1);
        assert_eq!(" d6 ".parse::<RotationCode>().unwrap().to_string(), "D6");

        for bad in ["E1", "C0", "C7", "C", "C12", "", "1C"] {
            assert!(bad.parse::<RotationCode>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_location_parse() {
        assert_eq!("vgh".parse::<Location>(), Ok(Location::Vgh));
        assert_eq!(Location::Sph.to_string(), "SPH");
        assert!("UBC".parse::<Location>().is_err());
    }

    #[test]
    fn test_academic_year() {
        let year: AcademicYear = "2025-2026".parse().unwrap();
        assert_eq!(year.start_year(), 2025);
        assert_eq!(year.to_string(), "2025-2026");
        assert!("2025-2027".parse::<AcademicYear>().is_err());
        assert!("25-26".parse::<AcademicYear>().is_err());
        assert!("2025".parse::<AcademicYear>().is_err());
    }

    #[test]
    fn test_academic_year_rejects_signed_and_out_of_range() {
        assert!("+999-1000".parse::<AcademicYear>().is_err());
        assert!("-999-1000".parse::<AcademicYear>().is_err());
        assert!("0000-0001".parse::<AcademicYear>().is_err());
        assert!("2147483647-2147483648".parse::<AcademicYear>().is_err());
        assert_eq!("9998-9999".parse::<AcademicYear>().unwrap().end_year(), 9999);

        assert!(AcademicYear::starting(i32::MAX).is_err());
        assert!(AcademicYear::starting(0).is_err());
        assert_eq!(AcademicYear::starting(2025).unwrap().to_string(), "2025-2026");
    }

    #[test]
    fn test_context_rejects_reversed_dates() {
        let start = parse_date("2025-09-08").unwrap();
        let end = parse_date("2025-09-01").unwrap();
        let result = RotationContext::new(
            "C1".parse().unwrap(),
            Location::Vgh,
            start,
            end,
            AcademicYear::starting(2025).unwrap(),
        );
        assert!(matches!(result, Err(ContextError::DateOrder { .. })));
    }

    #[test]
    fn test_context_serialization() {
        let ctx = RotationContext::new(
            "B3".parse().unwrap(),
            Location::Smh,
            parse_date("2025-09-01").unwrap(),
            parse_date("2025-09-28").unwrap(),
            AcademicYear::starting(2025).unwrap(),
        )
        .unwrap();
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["rotationCode"], "B3");
        assert_eq!(json["location"], "SMH");
        assert_eq!(json["startDate"], "2025-09-01");
        assert_eq!(json["academicYear"], "2025-2026");

        let back: RotationContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }
}
