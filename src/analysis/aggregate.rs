//! Grouped shift counts.
//!
//! `aggregate` groups enriched rows by an ordered list of keys and counts
//! them, optionally converting counts to percentages of each group's parent
//! partition (the stacked-bar-sums-to-100 convention). Output order is the
//! fixed domain order of each key, never frequency order:
//!
//! - class: 1, 2, 3, 4, then rows with no class
//! - time of day: Morning, Evening, Night
//! - site: UM, SJ, HMC, then any other site alphabetically
//! - resident: by last name, then display name
//! - shift area: alphabetical

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::model::{EnrichedShift, Site, TimeOfDay};

/// Row predicate applied before grouping.
pub type RowFilter<'a> = &'a dyn Fn(&EnrichedShift) -> bool;

// ---------------------------------------------------------------------------
// Group keys and values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKey {
    Class,
    Site,
    TimeOfDay,
    Resident,
    ShiftArea,
}

impl GroupKey {
    /// Column name in exported tables.
    pub fn column(&self) -> &'static str {
        match self {
            GroupKey::Class => "class",
            GroupKey::Site => "site",
            GroupKey::TimeOfDay => "time_of_day",
            GroupKey::Resident => "resident",
            GroupKey::ShiftArea => "shift_area",
        }
    }

    fn value_of(&self, row: &EnrichedShift) -> GroupValue {
        match self {
            GroupKey::Class => GroupValue::Class(row.training_year),
            GroupKey::Site => GroupValue::Site(row.shift.site.clone()),
            GroupKey::TimeOfDay => GroupValue::TimeOfDay(row.shift.time_of_day),
            GroupKey::Resident => GroupValue::Resident {
                last_name: row.shift.last_name.clone(),
                display_name: row.shift.display_name.clone(),
            },
            GroupKey::ShiftArea => GroupValue::ShiftArea(row.shift.shift_code.clone()),
        }
    }
}

/// One coordinate of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupValue {
    Class(Option<u8>),
    Site(Site),
    TimeOfDay(TimeOfDay),
    Resident { last_name: String, display_name: String },
    ShiftArea(String),
}

impl GroupValue {
    fn variant_rank(&self) -> u8 {
        match self {
            GroupValue::Class(_) => 0,
            GroupValue::Site(_) => 1,
            GroupValue::TimeOfDay(_) => 2,
            GroupValue::Resident { .. } => 3,
            GroupValue::ShiftArea(_) => 4,
        }
    }

    /// Value as it appears in an exported row.
    pub fn to_json(&self) -> Value {
        match self {
            GroupValue::Class(Some(year)) => Value::from(*year),
            GroupValue::Class(None) => Value::Null,
            GroupValue::Site(site) => Value::from(site.code()),
            GroupValue::TimeOfDay(tod) => Value::from(tod.label()),
            GroupValue::Resident { display_name, .. } => Value::from(display_name.as_str()),
            GroupValue::ShiftArea(area) => Value::from(area.as_str()),
        }
    }
}

impl Ord for GroupValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupValue::Class(a), GroupValue::Class(b)) => match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            (GroupValue::Site(a), GroupValue::Site(b)) => a.cmp(b),
            (GroupValue::TimeOfDay(a), GroupValue::TimeOfDay(b)) => a.cmp(b),
            (
                GroupValue::Resident { last_name: la, display_name: da },
                GroupValue::Resident { last_name: lb, display_name: db },
            ) => la.cmp(lb).then_with(|| da.cmp(db)),
            (GroupValue::ShiftArea(a), GroupValue::ShiftArea(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl PartialOrd for GroupValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Class(Some(year)) => write!(f, "PGY{}", year),
            GroupValue::Class(None) => write!(f, "Off-service"),
            GroupValue::Site(site) => write!(f, "{}", site),
            GroupValue::TimeOfDay(tod) => write!(f, "{}", tod),
            GroupValue::Resident { display_name, .. } => write!(f, "{}", display_name),
            GroupValue::ShiftArea(area) => write!(f, "{}", area),
        }
    }
}

// ---------------------------------------------------------------------------
// Count tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CountRow {
    /// One value per group key, in key order.
    pub key: Vec<GroupValue>,
    pub count: usize,
    /// Share of the parent partition, 0–100. Set only for normalized tables.
    pub percent: Option<f64>,
}

impl CountRow {
    /// The reported measure: percent for normalized tables, else count.
    pub fn value(&self) -> f64 {
        self.percent.unwrap_or(self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountTable {
    pub keys: Vec<GroupKey>,
    pub normalized: bool,
    pub rows: Vec<CountRow>,
}

impl CountTable {
    pub fn value_column(&self) -> &'static str {
        if self.normalized { "percent" } else { "count" }
    }

    /// Number of rows counted across all groups.
    pub fn total(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn get(&self, key: &[GroupValue]) -> Option<&CountRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Rows as JSON objects keyed by the column contract.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (key, value) in self.keys.iter().zip(&row.key) {
                    record.insert(key.column().to_string(), value.to_json());
                }
                let measure = match row.percent {
                    Some(p) => Value::from(p),
                    None => Value::from(row.count),
                };
                record.insert(self.value_column().to_string(), measure);
                Value::Object(record)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Count rows per group.
///
/// `keys` is an ordered set; repeated keys after the first are ignored.
/// With `normalize`, each count becomes its percentage of the total of all
/// groups sharing the same leading keys (all keys but the last). For a
/// single key that parent is the whole filtered table.
pub fn aggregate(
    rows: &[EnrichedShift],
    keys: &[GroupKey],
    filter: Option<RowFilter<'_>>,
    normalize: bool,
) -> CountTable {
    let mut unique_keys: Vec<GroupKey> = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique_keys.contains(key) {
            unique_keys.push(*key);
        }
    }

    let mut counts: BTreeMap<Vec<GroupValue>, usize> = BTreeMap::new();
    for row in rows.iter().filter(|r| filter.is_none_or(|f| f(*r))) {
        let key: Vec<GroupValue> = unique_keys.iter().map(|k| k.value_of(row)).collect();
        *counts.entry(key).or_insert(0) += 1;
    }

    let parent_totals: HashMap<Vec<GroupValue>, usize> = if normalize {
        let mut totals = HashMap::new();
        for (key, count) in &counts {
            *totals.entry(parent_of(key).to_vec()).or_insert(0) += count;
        }
        totals
    } else {
        HashMap::new()
    };

    let rows = counts
        .into_iter()
        .map(|(key, count)| {
            let percent = normalize.then(|| {
                let parent = parent_totals.get(parent_of(&key)).copied().unwrap_or(0);
                if parent == 0 { 0.0 } else { count as f64 * 100.0 / parent as f64 }
            });
            CountRow { key, count, percent }
        })
        .collect();

    CountTable { keys: unique_keys, normalized: normalize, rows }
}

fn parent_of(key: &[GroupValue]) -> &[GroupValue] {
    &key[..key.len().saturating_sub(1)]
}

// ---------------------------------------------------------------------------
// Headline totals
// ---------------------------------------------------------------------------

/// Totals behind the headline statistics sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_shifts: usize,
    /// Sum of feed-reported shift lengths.
    pub person_hours: f64,
    /// Distinct `resident_id`s among the counted shifts.
    pub distinct_residents: usize,
}

pub fn summarize(rows: &[EnrichedShift], filter: Option<RowFilter<'_>>) -> Summary {
    let mut total_shifts = 0;
    let mut person_hours = 0.0;
    let mut residents: HashSet<&str> = HashSet::new();

    for row in rows.iter().filter(|r| filter.is_none_or(|f| f(*r))) {
        total_shifts += 1;
        person_hours += row.shift.length_hours;
        residents.insert(row.shift.resident_id.as_str());
    }

    Summary {
        total_shifts,
        person_hours,
        distinct_residents: residents.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Shift;
    use chrono::NaiveDate;

    fn row(resident: (&str, &str, &str), year: Option<u8>, site: &str, hour: u32, hours: f64) -> EnrichedShift {
        let (id, first, last) = resident;
        let start = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        EnrichedShift {
            shift: Shift {
                id: format!("{}-{}-{}", id, site, hour),
                resident_id: id.to_string(),
                display_name: format!("{} {}", &first[..1], last),
                first_name: first.to_string(),
                last_name: last.to_string(),
                site: Site::from_code(site),
                shift_code: format!("{}-{}", site, hour),
                group: "EM".to_string(),
                group_id: "1".to_string(),
                facility_id: site.to_string(),
                start,
                end: start + chrono::Duration::hours(hours as i64),
                length_hours: hours,
                time_of_day: TimeOfDay::from_hour(hour),
            },
            training_year: year,
        }
    }

    const DOE: (&str, &str, &str) = ("1001", "Jane", "Doe");
    const ABLE: (&str, &str, &str) = ("1002", "Sam", "Able");
    const WU: (&str, &str, &str) = ("1003", "Lin", "Wu");

    fn mixed_rows() -> Vec<EnrichedShift> {
        vec![
            row(WU, Some(3), "HMC", 21, 10.0),
            row(DOE, Some(1), "SJ", 8, 8.0),
            row(ABLE, Some(1), "UM", 14, 9.0),
            row(DOE, Some(1), "UM", 8, 8.0),
            row(WU, Some(3), "UM", 8, 8.0),
            row(("9001", "Off", "Service"), None, "UM", 14, 9.0),
        ]
    }

    #[test]
    fn test_single_key_uses_domain_order_not_frequency() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Site], None, false);
        let keys: Vec<String> = table.rows.iter().map(|r| r.key[0].to_string()).collect();
        assert_eq!(keys, vec!["UM", "SJ", "HMC"]);
        assert_eq!(table.rows[0].count, 4);
        assert_eq!(table.total(), 6);
    }

    #[test]
    fn test_missing_class_sorts_last() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Class], None, false);
        let keys: Vec<GroupValue> = table.rows.iter().map(|r| r.key[0].clone()).collect();
        assert_eq!(
            keys,
            vec![GroupValue::Class(Some(1)), GroupValue::Class(Some(3)), GroupValue::Class(None)]
        );
    }

    #[test]
    fn test_resident_order_is_by_last_name() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Resident], None, false);
        let names: Vec<String> = table.rows.iter().map(|r| r.key[0].to_string()).collect();
        assert_eq!(names, vec!["S Able", "J Doe", "O Service", "L Wu"]);
    }

    #[test]
    fn test_filter_applies_before_grouping() {
        let only_pgy1 = |r: &EnrichedShift| r.training_year == Some(1);
        let table = aggregate(&mixed_rows(), &[GroupKey::TimeOfDay], Some(&only_pgy1), false);
        assert_eq!(table.total(), 3);
        assert_eq!(table.get(&[GroupValue::TimeOfDay(TimeOfDay::Morning)]).map(|r| r.count), Some(2));
        assert!(table.get(&[GroupValue::TimeOfDay(TimeOfDay::Night)]).is_none());
    }

    #[test]
    fn test_normalized_shares_sum_to_100_within_each_parent() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Class, GroupKey::Site], None, true);
        let mut sums: BTreeMap<Vec<GroupValue>, f64> = BTreeMap::new();
        for r in &table.rows {
            *sums.entry(r.key[..1].to_vec()).or_insert(0.0) += r.value();
        }
        for (parent, sum) in sums {
            assert!((sum - 100.0).abs() < 1e-9, "{:?} sums to {}", parent, sum);
        }

        let pgy1_um = table
            .get(&[GroupValue::Class(Some(1)), GroupValue::Site(Site::Um)])
            .expect("PGY1 at UM present");
        assert_eq!(pgy1_um.count, 2);
        assert!((pgy1_um.value() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_key_normalization_is_share_of_total() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Site], None, true);
        let um = table.get(&[GroupValue::Site(Site::Um)]).unwrap();
        assert!((um.value() - 4.0 * 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let rows = mixed_rows();
        let keys = [GroupKey::Resident, GroupKey::TimeOfDay];
        assert_eq!(aggregate(&rows, &keys, None, true), aggregate(&rows, &keys, None, true));
    }

    #[test]
    fn test_repeated_keys_are_ignored() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Site, GroupKey::Site], None, false);
        assert_eq!(table.keys, vec![GroupKey::Site]);
        assert_eq!(table.rows[0].key.len(), 1);
    }

    #[test]
    fn test_empty_input_gives_empty_table() {
        let table = aggregate(&[], &[GroupKey::Class], None, true);
        assert!(table.rows.is_empty());
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn test_records_follow_column_contract() {
        let table = aggregate(&mixed_rows(), &[GroupKey::Class, GroupKey::TimeOfDay], None, false);
        let first = &table.to_records()[0];
        assert_eq!(first["class"], Value::from(1u8));
        assert_eq!(first["time_of_day"], Value::from("Morning"));
        assert_eq!(first["count"], Value::from(2usize));

        let normalized = aggregate(&mixed_rows(), &[GroupKey::Site], None, true);
        let records = normalized.to_records();
        assert!(records[0].get("percent").is_some());
        assert!(records[0].get("count").is_none());
    }

    #[test]
    fn test_summary_totals() {
        let summary = summarize(&mixed_rows(), None);
        assert_eq!(summary.total_shifts, 6);
        assert_eq!(summary.person_hours, 52.0);
        assert_eq!(summary.distinct_residents, 4);

        let on_roster = |r: &EnrichedShift| r.training_year.is_some();
        let summary = summarize(&mixed_rows(), Some(&on_roster));
        assert_eq!(summary.total_shifts, 5);
        assert_eq!(summary.distinct_residents, 3);
    }
}
