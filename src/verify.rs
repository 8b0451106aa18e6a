//! Roster Coverage Verification
//!
//! Checks an enriched schedule against the resident roster to show where
//! the two disagree: feed residents missing from the roster (off-service
//! rotators, or roster gaps), roster residents with no shifts in the window,
//! and facility codes outside the three known sites.
//!
//! Run this after adding a new roster file or at the start of an academic
//! year to catch mismatched ids before they silently drop rows.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::analysis::enrich::match_counts;
use crate::model::EnrichedShift;
use crate::reference::ReferenceData;

// ============================================================================
// Coverage Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub summary: CoverageSummary,
    /// Feed residents with no roster class, most shifts first.
    pub off_service: Vec<UnmatchedResident>,
    /// Roster residents with a class but no shifts in the window.
    pub idle_residents: Vec<IdleResident>,
    /// Facility codes outside UM, SJ and HMC, alphabetical.
    pub unknown_sites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub total_shifts: usize,
    pub matched_shifts: usize,
    pub unmatched_shifts: usize,
    pub roster_size: usize,
    pub active_residents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedResident {
    pub resident_id: String,
    pub display_name: String,
    pub shift_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleResident {
    pub resident_id: String,
    pub training_year: u8,
}

// ============================================================================
// Coverage Check
// ============================================================================

/// Compare an enriched table with the roster.
///
/// Pass the table built without excluding off-service rows, otherwise the
/// off-service list is always empty.
pub fn check_coverage(rows: &[EnrichedShift], reference: &ReferenceData) -> CoverageReport {
    let counts = match_counts(rows);

    let mut off_service: BTreeMap<&str, UnmatchedResident> = BTreeMap::new();
    let mut active: BTreeMap<&str, usize> = BTreeMap::new();
    let mut unknown_sites: Vec<String> = Vec::new();

    for row in rows {
        let shift = &row.shift;
        if reference.find_resident(&shift.resident_id).is_some_and(|r| r.training_year.is_some()) {
            *active.entry(shift.resident_id.as_str()).or_insert(0) += 1;
        } else if row.training_year.is_none() {
            off_service
                .entry(shift.resident_id.as_str())
                .or_insert_with(|| UnmatchedResident {
                    resident_id: shift.resident_id.clone(),
                    display_name: shift.display_name.clone(),
                    shift_count: 0,
                })
                .shift_count += 1;
        }

        if !shift.site.is_known() && !unknown_sites.iter().any(|s| s == shift.site.code()) {
            unknown_sites.push(shift.site.code().to_string());
        }
    }
    unknown_sites.sort();

    let mut off_service: Vec<UnmatchedResident> = off_service.into_values().collect();
    off_service.sort_by(|a, b| b.shift_count.cmp(&a.shift_count).then_with(|| a.resident_id.cmp(&b.resident_id)));

    let idle_residents: Vec<IdleResident> = reference
        .residents()
        .iter()
        .filter(|r| !active.contains_key(r.resident_id.as_str()))
        .filter_map(|r| {
            r.training_year.map(|year| IdleResident {
                resident_id: r.resident_id.clone(),
                training_year: year,
            })
        })
        .collect();

    CoverageReport {
        summary: CoverageSummary {
            total_shifts: rows.len(),
            matched_shifts: counts.matched,
            unmatched_shifts: counts.unmatched,
            roster_size: reference.residents().len(),
            active_residents: active.len(),
        },
        off_service,
        idle_residents,
        unknown_sites,
    }
}

// ============================================================================
// Output
// ============================================================================

pub fn print_summary(report: &CoverageReport) {
    let s = &report.summary;
    println!("\n===========================================================");
    println!("ROSTER COVERAGE");
    println!("===========================================================");
    println!();
    println!("Shifts:            {} total  ({} on roster, {} off-service)",
        s.total_shifts, s.matched_shifts, s.unmatched_shifts);
    println!("Roster residents:  {}/{} with shifts", s.active_residents, s.roster_size);

    if !report.off_service.is_empty() {
        println!();
        println!("Off-service residents:");
        for r in &report.off_service {
            println!("  {:<10} {:<24} {} shifts", r.resident_id, r.display_name, r.shift_count);
        }
    }

    if !report.idle_residents.is_empty() {
        println!();
        println!("Roster residents without shifts:");
        for r in &report.idle_residents {
            println!("  {:<10} PGY{}", r.resident_id, r.training_year);
        }
    }

    if !report.unknown_sites.is_empty() {
        println!();
        println!("Unknown sites: {}", report.unknown_sites.join(", "));
    }

    let match_rate = if s.total_shifts > 0 {
        (s.matched_shifts as f64 / s.total_shifts as f64) * 100.0
    } else {
        0.0
    };
    println!();
    println!("Match Rate: {:.1}% ({}/{})", match_rate, s.matched_shifts, s.total_shifts);
    println!("===========================================================");
}
