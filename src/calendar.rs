/// Date window selection for the dashboard.
///
/// A user picks either the academic year to date, a named block from the
/// block calendar, or a custom start/end pair. Resolution turns that choice
/// into a concrete `DateRange`.
///
/// # Clock injection
/// Functions take `today: NaiveDate` rather than reading the system clock,
/// which keeps year-to-date resolution deterministic in tests.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::model::DateRange;
use crate::reference::ReferenceData;

/// Display format for dates in selection labels ("07/01/23").
pub const LABEL_DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("Unknown block {0:?}")]
    UnknownBlock(String),
    #[error("Invalid academic year start {month}/{day}")]
    InvalidAcademicYearStart { month: u32, day: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelection {
    /// From the start of the current academic year through today.
    YearToDate,
    /// Any start/end pair. Not validated here; the fetcher rejects
    /// `end < start`.
    Custom { start: NaiveDate, end: NaiveDate },
    /// The bounds of one block from the block calendar.
    Block(String),
}

/// Month and day on which each academic year begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicYearStart {
    pub month: u32,
    pub day: u32,
}

impl Default for AcademicYearStart {
    fn default() -> Self {
        Self { month: 7, day: 1 }
    }
}

impl AcademicYearStart {
    /// Most recent academic-year start on or before `today`.
    pub fn on_or_before(&self, today: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let invalid = || CalendarError::InvalidAcademicYearStart { month: self.month, day: self.day };
        let this_year = NaiveDate::from_ymd_opt(today.year(), self.month, self.day).ok_or_else(invalid)?;
        if this_year <= today {
            Ok(this_year)
        } else {
            NaiveDate::from_ymd_opt(today.year() - 1, self.month, self.day).ok_or_else(invalid)
        }
    }
}

impl DateSelection {
    pub fn resolve(
        &self,
        reference: &ReferenceData,
        today: NaiveDate,
        year_start: AcademicYearStart,
    ) -> Result<DateRange, CalendarError> {
        match self {
            DateSelection::YearToDate => Ok(DateRange::new(year_start.on_or_before(today)?, today)),
            DateSelection::Custom { start, end } => Ok(DateRange::new(*start, *end)),
            DateSelection::Block(block_id) => reference
                .find_block(block_id)
                .map(|block| block.range())
                .ok_or_else(|| CalendarError::UnknownBlock(block_id.clone())),
        }
    }
}

/// Selection choices in menu order: year to date, custom, then every block
/// in calendar-file order.
pub fn selection_options(
    reference: &ReferenceData,
    today: NaiveDate,
    year_start: AcademicYearStart,
) -> Result<Vec<(String, DateSelection)>, CalendarError> {
    let ytd_start = year_start.on_or_before(today)?;
    let mut options = vec![
        (
            format!(
                "Year to Date: {} to {}",
                ytd_start.format(LABEL_DATE_FORMAT),
                today.format(LABEL_DATE_FORMAT)
            ),
            DateSelection::YearToDate,
        ),
        (
            "Custom Date Range".to_string(),
            DateSelection::Custom { start: ytd_start, end: today },
        ),
    ];

    options.extend(reference.blocks().iter().map(|block| {
        (
            format!(
                "Block {}: {} to {}",
                block.block_id,
                block.start_date.format(LABEL_DATE_FORMAT),
                block.end_date.format(LABEL_DATE_FORMAT)
            ),
            DateSelection::Block(block.block_id.clone()),
        )
    }));

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::parse_block_dates;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> ReferenceData {
        let blocks = parse_block_dates(
            "Block,Start Date,End Date\n1,2023-07-01,2023-07-30\n2,2023-07-31,2023-08-27\n",
        )
        .unwrap();
        ReferenceData::new(blocks, Vec::new()).unwrap()
    }

    #[test]
    fn test_year_to_date_after_july_first() {
        let range = DateSelection::YearToDate
            .resolve(&reference(), date(2023, 10, 19), AcademicYearStart::default())
            .unwrap();
        assert_eq!(range, DateRange::new(date(2023, 7, 1), date(2023, 10, 19)));
    }

    #[test]
    fn test_year_to_date_before_july_uses_previous_year() {
        let range = DateSelection::YearToDate
            .resolve(&reference(), date(2024, 3, 2), AcademicYearStart::default())
            .unwrap();
        assert_eq!(range.start, date(2023, 7, 1));
    }

    #[test]
    fn test_year_to_date_on_start_day_is_single_day() {
        let range = DateSelection::YearToDate
            .resolve(&reference(), date(2023, 7, 1), AcademicYearStart::default())
            .unwrap();
        assert_eq!(range, DateRange::new(date(2023, 7, 1), date(2023, 7, 1)));
    }

    #[test]
    fn test_block_selection_uses_block_bounds() {
        let range = DateSelection::Block("2".to_string())
            .resolve(&reference(), date(2023, 10, 19), AcademicYearStart::default())
            .unwrap();
        assert_eq!(range, DateRange::new(date(2023, 7, 31), date(2023, 8, 27)));
    }

    #[test]
    fn test_unknown_block_is_an_error() {
        let err = DateSelection::Block("12".to_string())
            .resolve(&reference(), date(2023, 10, 19), AcademicYearStart::default())
            .unwrap_err();
        assert_eq!(err, CalendarError::UnknownBlock("12".to_string()));
    }

    #[test]
    fn test_custom_range_passes_through_unvalidated() {
        let range = DateSelection::Custom { start: date(2023, 9, 1), end: date(2023, 8, 1) }
            .resolve(&reference(), date(2023, 10, 19), AcademicYearStart::default())
            .unwrap();
        assert!(!range.is_valid());
    }

    #[test]
    fn test_invalid_year_start_is_reported() {
        let start = AcademicYearStart { month: 2, day: 30 };
        assert!(start.on_or_before(date(2023, 10, 19)).is_err());
    }

    #[test]
    fn test_selection_labels() {
        let options = selection_options(&reference(), date(2023, 10, 19), AcademicYearStart::default()).unwrap();
        let labels: Vec<&str> = options.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Year to Date: 07/01/23 to 10/19/23",
                "Custom Date Range",
                "Block 1: 07/01/23 to 07/30/23",
                "Block 2: 07/31/23 to 08/27/23",
            ]
        );
    }
}
