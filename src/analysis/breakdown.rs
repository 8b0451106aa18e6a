//! Chart breakdowns.
//!
//! Each dashboard chart is one `Breakdown` variant with a fixed set of
//! group keys and an optional row filter, run through the one aggregation
//! engine.

use std::fmt;
use std::str::FromStr;

use crate::analysis::aggregate::{aggregate, CountTable, GroupKey};
use crate::model::{EnrichedShift, Site, TRAINING_YEARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakdown {
    ByClass,
    BySite,
    ByTimeOfDay,
    ByResident,
    /// Site split stacked within each class.
    SiteByClass,
    /// Time-of-day split stacked within each class.
    TimeOfDayByClass,
    /// Time-of-day split per resident, optionally for one class only.
    TimeOfDayByResident { class: Option<u8> },
    SiteByResident { class: Option<u8> },
    /// Shift-area split per resident, UM shifts only.
    ShiftAreaByResident { class: Option<u8> },
}

impl Breakdown {
    /// The four single-dimension overview charts.
    pub const OVERVIEW: [Breakdown; 4] = [
        Breakdown::ByClass,
        Breakdown::ByTimeOfDay,
        Breakdown::BySite,
        Breakdown::ByResident,
    ];

    pub fn group_keys(&self) -> &'static [GroupKey] {
        match self {
            Breakdown::ByClass => &[GroupKey::Class],
            Breakdown::BySite => &[GroupKey::Site],
            Breakdown::ByTimeOfDay => &[GroupKey::TimeOfDay],
            Breakdown::ByResident => &[GroupKey::Resident],
            Breakdown::SiteByClass => &[GroupKey::Class, GroupKey::Site],
            Breakdown::TimeOfDayByClass => &[GroupKey::Class, GroupKey::TimeOfDay],
            Breakdown::TimeOfDayByResident { .. } => &[GroupKey::Resident, GroupKey::TimeOfDay],
            Breakdown::SiteByResident { .. } => &[GroupKey::Resident, GroupKey::Site],
            Breakdown::ShiftAreaByResident { .. } => &[GroupKey::Resident, GroupKey::ShiftArea],
        }
    }

    fn class_filter(&self) -> Option<u8> {
        match self {
            Breakdown::TimeOfDayByResident { class }
            | Breakdown::SiteByResident { class }
            | Breakdown::ShiftAreaByResident { class } => *class,
            _ => None,
        }
    }

    fn accepts(&self, row: &EnrichedShift) -> bool {
        if let Some(class) = self.class_filter() {
            if row.training_year != Some(class) {
                return false;
            }
        }
        match self {
            Breakdown::ShiftAreaByResident { .. } => row.shift.site == Site::Um,
            _ => true,
        }
    }

    fn has_filter(&self) -> bool {
        self.class_filter().is_some() || matches!(self, Breakdown::ShiftAreaByResident { .. })
    }

    /// Run this breakdown over an enriched table.
    pub fn run(&self, rows: &[EnrichedShift], normalize: bool) -> CountTable {
        let filter = |row: &EnrichedShift| self.accepts(row);
        if self.has_filter() {
            aggregate(rows, self.group_keys(), Some(&filter), normalize)
        } else {
            aggregate(rows, self.group_keys(), None, normalize)
        }
    }

    /// Chart title.
    pub fn title(&self) -> String {
        let base = match self {
            Breakdown::ByClass => "Shifts by Class",
            Breakdown::BySite => "Shifts by Site",
            Breakdown::ByTimeOfDay => "Shifts by Time of Day",
            Breakdown::ByResident => "Shifts by Resident",
            Breakdown::SiteByClass => "Shift Counts by Site and Class",
            Breakdown::TimeOfDayByClass => "Shift Counts by Time of Day and Class",
            Breakdown::TimeOfDayByResident { .. } => "Shifts by Time of Day",
            Breakdown::SiteByResident { .. } => "Shifts by Site",
            Breakdown::ShiftAreaByResident { .. } => "Shifts by Shift Area (UM Only)",
        };
        match self.class_filter() {
            Some(class) => format!("{}: PGY {}", base, class),
            None => base.to_string(),
        }
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Breakdown::ByClass => "class",
            Breakdown::BySite => "site",
            Breakdown::ByTimeOfDay => "time-of-day",
            Breakdown::ByResident => "resident",
            Breakdown::SiteByClass => "class-site",
            Breakdown::TimeOfDayByClass => "class-time-of-day",
            Breakdown::TimeOfDayByResident { .. } => "resident-time-of-day",
            Breakdown::SiteByResident { .. } => "resident-site",
            Breakdown::ShiftAreaByResident { .. } => "resident-shift-area",
        };
        match self.class_filter() {
            Some(class) => write!(f, "{}:{}", name, class),
            None => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown breakdown {0:?}")]
pub struct UnknownBreakdown(pub String);

impl FromStr for Breakdown {
    type Err = UnknownBreakdown;

    /// Parses the `Display` form, e.g. `site`, `class-time-of-day`, or
    /// `resident-site:2` for one class.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownBreakdown(s.to_string());
        let (name, class) = match s.trim().split_once(':') {
            Some((name, class)) => {
                let class: u8 = class.trim().parse().map_err(|_| unknown())?;
                if !TRAINING_YEARS.contains(&class) {
                    return Err(unknown());
                }
                (name.trim(), Some(class))
            }
            None => (s.trim(), None),
        };

        let breakdown = match name {
            "class" => Breakdown::ByClass,
            "site" => Breakdown::BySite,
            "time-of-day" => Breakdown::ByTimeOfDay,
            "resident" => Breakdown::ByResident,
            "class-site" => Breakdown::SiteByClass,
            "class-time-of-day" => Breakdown::TimeOfDayByClass,
            "resident-time-of-day" => Breakdown::TimeOfDayByResident { class },
            "resident-site" => Breakdown::SiteByResident { class },
            "resident-shift-area" => Breakdown::ShiftAreaByResident { class },
            _ => return Err(unknown()),
        };

        if class.is_some() && breakdown.class_filter().is_none() {
            return Err(unknown());
        }
        Ok(breakdown)
    }
}
