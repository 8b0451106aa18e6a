/// Core data types for the residency shift statistics service.
///
/// This module defines the shared domain model imported by all other modules:
/// the raw ShiftAdmin feed record, the canonical `Shift`, the two reference
/// entities (`Resident`, `BlockDate`), the enriched row consumed by the
/// aggregation engine, and the pipeline error taxonomy.
/// It contains no I/O.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Valid postgraduate training years for program residents.
pub const TRAINING_YEARS: RangeInclusive<u8> = 1..=4;

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

/// Time-of-day bucket for a shift, derived from the hour its start falls in.
///
/// Variant order is the fixed display order used by every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeOfDay {
    Morning,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Morning, TimeOfDay::Evening, TimeOfDay::Night];

    /// Classifies a local hour-of-day (0..=23) with half-open boundaries:
    ///   hour >= 20       → Night
    ///   11 <= hour < 20  → Evening
    ///   hour < 11        → Morning
    pub fn from_hour(hour: u32) -> Self {
        if hour >= 20 {
            TimeOfDay::Night
        } else if hour >= 11 {
            TimeOfDay::Evening
        } else {
            TimeOfDay::Morning
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// Facility where a shift is worked.
///
/// The program staffs three hospital sites; anything else the feed reports is
/// kept verbatim in `Other` and ordered after the known sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Site {
    Um,
    Sj,
    Hmc,
    Other(String),
}

impl Site {
    /// Known sites in their fixed display order.
    pub const KNOWN: [Site; 3] = [Site::Um, Site::Sj, Site::Hmc];

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "UM" => Site::Um,
            "SJ" => Site::Sj,
            "HMC" => Site::Hmc,
            other => Site::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Site::Um => "UM",
            Site::Sj => "SJ",
            Site::Hmc => "HMC",
            Site::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Site::Other(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Site::Um => 0,
            Site::Sj => 1,
            Site::Hmc => 2,
            Site::Other(_) => 3,
        }
    }
}

impl Ord for Site {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.code().cmp(other.code()))
    }
}

impl PartialOrd for Site {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<String> for Site {
    fn from(code: String) -> Self {
        Site::from_code(&code)
    }
}

impl From<Site> for String {
    fn from(site: Site) -> Self {
        site.code().to_string()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Raw feed records
// ---------------------------------------------------------------------------

/// A scalar the ShiftAdmin feed sends either as a JSON number or a string.
///
/// Identifiers and `shiftHours` have been observed in both forms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FeedScalar {
    Number(serde_json::Number),
    Text(String),
}

impl FeedScalar {
    pub fn as_text(&self) -> String {
        match self {
            FeedScalar::Number(n) => n.to_string(),
            FeedScalar::Text(s) => s.trim().to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeedScalar::Number(n) => n.as_f64(),
            FeedScalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One entry of `data.scheduledShifts[]` in a ShiftAdmin response, as sent.
///
/// Feed-internal identifiers (`employeeID`, `nPI`, `facilityExtID`) are not
/// part of a canonical `Shift`; only the feed directory reads them.
///
/// `shiftStart`/`shiftEnd` are kept as raw JSON so that a null, numeric or
/// missing timestamp reaches the normalizer and fails as a malformed record
/// rather than as an unreadable payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShift {
    #[serde(rename = "shiftID", default)]
    pub shift_id: Option<FeedScalar>,
    #[serde(rename = "userID")]
    pub user_id: FeedScalar,
    #[serde(rename = "employeeID", default)]
    pub employee_id: Option<FeedScalar>,
    #[serde(rename = "nPI", default)]
    pub npi: Option<FeedScalar>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub shift_start: serde_json::Value, // "2023-07-01 07:00:00", local wall-clock time
    #[serde(default)]
    pub shift_end: serde_json::Value,
    pub shift_hours: FeedScalar,
    pub facility_abbreviation: String,
    pub shift_short_name: String,
    pub group_short_name: String,
    #[serde(rename = "facilityID")]
    pub facility_id: FeedScalar,
    #[serde(rename = "facilityExtID", default)]
    pub facility_ext_id: Option<FeedScalar>,
    #[serde(rename = "groupID")]
    pub group_id: FeedScalar,
}

/// Ordered raw records, in the order the API returned them.
pub type RawShiftList = Vec<RawShift>;

// ---------------------------------------------------------------------------
// Canonical shift
// ---------------------------------------------------------------------------

/// A normalized scheduled shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shift {
    pub id: String,
    /// Key into the resident roster; may have no roster match.
    pub resident_id: String,
    /// First initial and last name, e.g. "J Doe".
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub site: Site,
    pub shift_code: String,
    pub group: String,
    pub group_id: String,
    pub facility_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Duration as reported by the feed; not recomputed from start/end.
    pub length_hours: f64,
    pub time_of_day: TimeOfDay,
}

impl Shift {
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }
}

/// A shift joined with the worker's training year from the roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedShift {
    #[serde(flatten)]
    pub shift: Shift,
    /// `None` for off-service workers with no roster match.
    pub training_year: Option<u8>,
}

// ---------------------------------------------------------------------------
// Reference entities
// ---------------------------------------------------------------------------

/// A program resident from the roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resident {
    pub resident_id: String,
    pub first_name: String,
    pub last_name: String,
    pub training_year: Option<u8>,
}

/// An administrative scheduling block with inclusive calendar bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDate {
    pub block_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Date the mid-block rotation transition takes effect, if any.
    pub mid_transition: Option<NaiveDate>,
}

impl BlockDate {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

// ---------------------------------------------------------------------------
// Date window
// ---------------------------------------------------------------------------

/// A calendar window requested from the schedule API. Not validated on
/// construction; the fetcher rejects `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why an upstream fetch did not produce a usable shift list.
///
/// All kinds surface to callers as `ScheduleError::UpstreamFetch`; the kind
/// exists so operators can tell an empty window from a rejected key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    #[error("API status was {0:?}, expected \"success\"")]
    StatusNotSuccess(String),
    #[error("No scheduledShifts entries in response")]
    EmptyShiftList,
    #[error("Parse error: {0}")]
    MalformedPayload(String),
}

/// Errors raised by the schedule pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// End date precedes start date. Raised before any network call.
    #[error("Invalid date range: end date {end} precedes start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// The API call failed, was rejected, or returned no shifts.
    #[error("ShiftAdmin API failure: {failure}")]
    UpstreamFetch {
        failure: FetchFailure,
        /// Response body as received, for diagnostics. Empty when the
        /// request never produced a body.
        raw_response: String,
    },
    /// A record in an otherwise successful response could not be normalized.
    #[error("Malformed shift record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

impl ScheduleError {
    /// None of the pipeline errors clear up without user or operator action.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Message suitable for showing to a dashboard user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScheduleError::InvalidRange { .. } => "End Date must come after Start Date",
            ScheduleError::UpstreamFetch { .. } => "ShiftAdmin API failure",
            ScheduleError::MalformedRecord { .. } => "ShiftAdmin returned a shift that could not be read",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(10), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(19), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Night);
    }

    #[test]
    fn test_time_of_day_covers_every_hour() {
        for hour in 0..24 {
            let expected = match hour {
                0..=10 => TimeOfDay::Morning,
                11..=19 => TimeOfDay::Evening,
                _ => TimeOfDay::Night,
            };
            assert_eq!(TimeOfDay::from_hour(hour), expected, "hour {}", hour);
        }
    }

    #[test]
    fn test_site_order_is_fixed_then_alphabetical() {
        let mut sites = vec![
            Site::from_code("ZZ"),
            Site::from_code("HMC"),
            Site::from_code("AA"),
            Site::from_code("UM"),
            Site::from_code("SJ"),
        ];
        sites.sort();
        let codes: Vec<&str> = sites.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec!["UM", "SJ", "HMC", "AA", "ZZ"]);
    }

    #[test]
    fn test_feed_scalar_accepts_numbers_and_strings() {
        let n: FeedScalar = serde_json::from_str("1234").unwrap();
        let s: FeedScalar = serde_json::from_str("\" 1234 \"").unwrap();
        assert_eq!(n.as_text(), "1234");
        assert_eq!(s.as_text(), "1234");
        assert_eq!(serde_json::from_str::<FeedScalar>("\"8.5\"").unwrap().as_f64(), Some(8.5));
        assert_eq!(serde_json::from_str::<FeedScalar>("\"eight\"").unwrap().as_f64(), None);
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let day = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
        let next = NaiveDate::from_ymd_opt(2023, 8, 2).unwrap();
        assert!(DateRange::new(day, day).is_valid());
        assert!(DateRange::new(day, next).is_valid());
        assert!(!DateRange::new(next, day).is_valid());
    }

    #[test]
    fn test_schedule_errors_are_never_retryable() {
        let err = ScheduleError::UpstreamFetch {
            failure: FetchFailure::EmptyShiftList,
            raw_response: "{}".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "ShiftAdmin API failure");
    }
}
