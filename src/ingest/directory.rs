//! Lookup tables derived from a raw schedule feed.
//!
//! Every feed record repeats the same group, user and facility details.
//! `directory` folds a raw list into one deduplicated table per entity,
//! keyed by the feed's own identifiers and sorted by key. It reads the
//! feed-internal identifiers (employee id, NPI, facility extension id) that
//! normalization drops, so it works on `RawShift`s rather than `Shift`s.
//!
//! When a key appears with differing details, the first record wins.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{FeedScalar, RawShift};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub employee_id: Option<String>,
    pub npi: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityEntry {
    pub ext_id: Option<String>,
    pub abbreviation: String,
}

/// A named shift slot (e.g. "UM-Pod-A") and where it is worked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftAreaEntry {
    pub facility_id: String,
    pub group_id: String,
    /// Every shift instance seen under this name.
    pub shift_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedDirectory {
    /// groupID → groupShortName
    pub groups: BTreeMap<String, String>,
    /// userID → user details
    pub users: BTreeMap<String, UserEntry>,
    /// facilityID → facility details
    pub facilities: BTreeMap<String, FacilityEntry>,
    /// shiftShortName → shift slot details
    pub shift_areas: BTreeMap<String, ShiftAreaEntry>,
}

fn optional_text(value: &Option<FeedScalar>) -> Option<String> {
    value.as_ref().map(FeedScalar::as_text).filter(|s| !s.is_empty())
}

/// Build the lookup tables for a raw feed.
pub fn directory(raw: &[RawShift]) -> FeedDirectory {
    let mut dir = FeedDirectory::default();

    for record in raw {
        let group_id = record.group_id.as_text();
        let facility_id = record.facility_id.as_text();

        dir.groups
            .entry(group_id.clone())
            .or_insert_with(|| record.group_short_name.clone());

        dir.users
            .entry(record.user_id.as_text())
            .or_insert_with(|| UserEntry {
                employee_id: optional_text(&record.employee_id),
                npi: optional_text(&record.npi),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
            });

        dir.facilities
            .entry(facility_id.clone())
            .or_insert_with(|| FacilityEntry {
                ext_id: optional_text(&record.facility_ext_id),
                abbreviation: record.facility_abbreviation.clone(),
            });

        let area = dir
            .shift_areas
            .entry(record.shift_short_name.clone())
            .or_insert_with(|| ShiftAreaEntry {
                facility_id,
                group_id,
                shift_ids: BTreeSet::new(),
            });
        if let Some(id) = optional_text(&record.shift_id) {
            area.shift_ids.insert(id);
        }
    }

    dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn record(shift_id: u32, user: &str, code: &str, facility: (u32, &str, &str)) -> RawShift {
        let (facility_id, abbreviation, ext_id) = facility;
        RawShift::deserialize(json!({
            "shiftID": shift_id,
            "userID": user,
            "employeeID": format!("E-{}", user),
            "nPI": "1234567890",
            "firstName": "Jane",
            "lastName": format!("Doe{}", user),
            "shiftStart": "2023-08-01 07:00:00",
            "shiftEnd": "2023-08-01 15:00:00",
            "shiftHours": 8,
            "facilityAbbreviation": abbreviation,
            "shiftShortName": code,
            "groupShortName": "EM",
            "facilityID": facility_id,
            "facilityExtID": ext_id,
            "groupID": 1
        }))
        .unwrap()
    }

    const UM: (u32, &str, &str) = (12, "UM", "UMH");
    const SJ: (u32, &str, &str) = (7, "SJ", "SJH");

    #[test]
    fn test_tables_are_deduplicated() {
        let raw = vec![
            record(1, "200", "UM-Pod-A", UM),
            record(2, "200", "UM-Pod-A", UM),
            record(3, "100", "SJ-Main", SJ),
        ];
        let dir = directory(&raw);

        assert_eq!(dir.groups.len(), 1);
        assert_eq!(dir.groups["1"], "EM");
        assert_eq!(dir.users.len(), 2);
        assert_eq!(dir.facilities.len(), 2);
        assert_eq!(dir.shift_areas.len(), 2);
    }

    #[test]
    fn test_tables_are_sorted_by_key() {
        let raw = vec![
            record(1, "200", "UM-Pod-A", UM),
            record(3, "100", "SJ-Main", SJ),
        ];
        let dir = directory(&raw);

        let users: Vec<&str> = dir.users.keys().map(String::as_str).collect();
        assert_eq!(users, vec!["100", "200"]);
        let areas: Vec<&str> = dir.shift_areas.keys().map(String::as_str).collect();
        assert_eq!(areas, vec!["SJ-Main", "UM-Pod-A"]);
    }

    #[test]
    fn test_keeps_feed_internal_identifiers() {
        let dir = directory(&[record(1, "200", "UM-Pod-A", UM)]);

        let user = &dir.users["200"];
        assert_eq!(user.employee_id.as_deref(), Some("E-200"));
        assert_eq!(user.npi.as_deref(), Some("1234567890"));
        assert_eq!(user.last_name, "Doe200");

        let facility = &dir.facilities["12"];
        assert_eq!(facility.ext_id.as_deref(), Some("UMH"));
        assert_eq!(facility.abbreviation, "UM");
    }

    #[test]
    fn test_shift_area_collects_instance_ids() {
        let raw = vec![
            record(5, "200", "UM-Pod-A", UM),
            record(4, "100", "UM-Pod-A", UM),
            record(5, "100", "UM-Pod-A", UM),
        ];
        let area = &directory(&raw).shift_areas["UM-Pod-A"];
        assert_eq!(area.facility_id, "12");
        assert_eq!(area.group_id, "1");
        assert_eq!(area.shift_ids.iter().map(String::as_str).collect::<Vec<_>>(), vec!["4", "5"]);
    }

    #[test]
    fn test_first_record_wins_on_conflicting_details() {
        let raw = vec![
            record(1, "200", "UM-Pod-A", UM),
            record(2, "201", "UM-Pod-A", (12, "UMX", "OTHER")),
        ];
        let facility = &directory(&raw).facilities["12"];
        assert_eq!(facility.abbreviation, "UM");
    }

    #[test]
    fn test_empty_feed_gives_empty_directory() {
        assert_eq!(directory(&[]), FeedDirectory::default());
    }
}
