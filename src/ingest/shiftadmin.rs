/// ShiftAdmin scheduled-shifts API client
///
/// Retrieves the program's scheduled shifts for a calendar window and
/// normalizes the raw feed into canonical `Shift` records.
///
/// Endpoint: https://www.shiftadmin.com/api_getscheduledshifts_json.php
/// Response: {"status": "success", "data": {"scheduledShifts": [...]}}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::ingest::transport::Transport;
use crate::model::{
    DateRange, FetchFailure, RawShift, RawShiftList, ScheduleError, Shift, Site, TimeOfDay,
};

/// Date format the API expects for the `sd`/`ed` parameters.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Wall-clock formats the feed has been seen to use for `shiftStart`/`shiftEnd`.
const FEED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// ============================================================================
// Fetch
// ============================================================================

/// Builds the query parameters for one scheduled-shifts request.
pub fn build_query(api: &ApiConfig, start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("validationKey", api.validation_key.clone()),
        ("gid", api.group_id.to_string()),
        ("sd", start.format(API_DATE_FORMAT).to_string()),
        ("ed", end.format(API_DATE_FORMAT).to_string()),
    ]
}

/// Fetch the raw scheduled shifts between `start` and `end` (inclusive).
///
/// Rejects `end < start` with `InvalidRange` before touching the transport.
/// Otherwise issues exactly one request; there is no retry.
///
/// # Returns
/// The non-empty list of raw records, in API order.
pub fn fetch_schedule(
    transport: &dyn Transport,
    api: &ApiConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RawShiftList, ScheduleError> {
    if !DateRange::new(start, end).is_valid() {
        return Err(ScheduleError::InvalidRange { start, end });
    }

    let query = build_query(api, start, end);

    let response = transport
        .get(&api.url, &query)
        .map_err(|e| ScheduleError::UpstreamFetch {
            failure: FetchFailure::Transport(e.to_string()),
            raw_response: String::new(),
        })?;

    if !response.is_success() {
        return Err(ScheduleError::UpstreamFetch {
            failure: FetchFailure::HttpStatus(response.status),
            raw_response: response.body,
        });
    }

    parse_response(&response.body).map_err(|failure| ScheduleError::UpstreamFetch {
        failure,
        raw_response: response.body.clone(),
    })
}

/// Validate a response body and extract its shift records.
///
/// Success requires `status == "success"` and at least one entry in
/// `data.scheduledShifts`.
pub fn parse_response(body: &str) -> Result<RawShiftList, FetchFailure> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| FetchFailure::MalformedPayload(e.to_string()))?;

    let status = json
        .get("status")
        .and_then(|s| s.as_str())
        .ok_or_else(|| FetchFailure::MalformedPayload("missing \"status\" field".to_string()))?;

    if status != "success" {
        return Err(FetchFailure::StatusNotSuccess(status.to_string()));
    }

    let entries = json
        .get("data")
        .and_then(|d| d.get("scheduledShifts"))
        .and_then(|s| s.as_array())
        .ok_or_else(|| {
            FetchFailure::MalformedPayload("missing \"data.scheduledShifts\" array".to_string())
        })?;

    if entries.is_empty() {
        return Err(FetchFailure::EmptyShiftList);
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            RawShift::deserialize(entry)
                .map_err(|e| FetchFailure::MalformedPayload(format!("scheduledShifts[{}]: {}", i, e)))
        })
        .collect()
}

// ============================================================================
// Normalize
// ============================================================================

/// Convert raw feed records into canonical shifts.
///
/// All-or-nothing: the first record that cannot be normalized fails the
/// whole batch. Output order follows input order.
pub fn normalize(raw: &[RawShift]) -> Result<Vec<Shift>, ScheduleError> {
    raw.iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record))
        .collect()
}

fn normalize_record(index: usize, raw: &RawShift) -> Result<Shift, ScheduleError> {
    let malformed = |reason: String| ScheduleError::MalformedRecord { index, reason };

    let start_text = raw
        .shift_start
        .as_str()
        .ok_or_else(|| malformed(format!("shiftStart is not a timestamp string: {}", raw.shift_start)))?;
    let end_text = raw
        .shift_end
        .as_str()
        .ok_or_else(|| malformed(format!("shiftEnd is not a timestamp string: {}", raw.shift_end)))?;

    let start = parse_feed_timestamp(start_text)
        .ok_or_else(|| malformed(format!("unparseable shiftStart {:?}", start_text)))?;
    let end = parse_feed_timestamp(end_text)
        .ok_or_else(|| malformed(format!("unparseable shiftEnd {:?}", end_text)))?;

    if end <= start {
        return Err(malformed(format!(
            "shiftEnd {} is not after shiftStart {}",
            end_text, start_text
        )));
    }

    let length_hours = raw
        .shift_hours
        .as_f64()
        .filter(|h| h.is_finite())
        .ok_or_else(|| malformed(format!("non-numeric shiftHours {:?}", raw.shift_hours.as_text())))?;

    let resident_id = raw.user_id.as_text();
    let id = match &raw.shift_id {
        Some(id) => id.as_text(),
        None => format!("{}:{}:{}", resident_id, start_text, raw.shift_short_name),
    };

    Ok(Shift {
        id,
        display_name: display_name(&raw.first_name, &raw.last_name),
        first_name: raw.first_name.clone(),
        last_name: raw.last_name.clone(),
        resident_id,
        site: Site::from_code(&raw.facility_abbreviation),
        shift_code: raw.shift_short_name.clone(),
        group: raw.group_short_name.clone(),
        group_id: raw.group_id.as_text(),
        facility_id: raw.facility_id.as_text(),
        time_of_day: TimeOfDay::from_hour(start.hour()),
        start,
        end,
        length_hours,
    })
}

/// Parse a feed timestamp, keeping its local wall-clock time.
///
/// RFC 3339 strings with an offset keep their local part; no conversion
/// to another zone is applied.
pub fn parse_feed_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    FEED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

/// Compact chart label: first character of the first name, a space, and
/// the last name ("Jane", "Doe" → "J Doe").
pub fn display_name(first_name: &str, last_name: &str) -> String {
    let initial: String = first_name.chars().take(1).collect();
    format!("{} {}", initial, last_name)
}

// ============================================================================
// Tests
// ============================================================================
