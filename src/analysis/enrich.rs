//! Roster enrichment.
//!
//! Attaches each shift's training year from the resident roster. The join
//! is left-outer; dropping off-service rows is a separate post-filter so the
//! output schema is the same either way.

use std::collections::HashMap;

use crate::model::{EnrichedShift, Resident, Shift};
use crate::reference::ReferenceData;

/// Join shifts to the roster on `resident_id`.
///
/// Every input shift appears exactly once, in input order, unless
/// `exclude_unmatched` is set, in which case rows without a training year
/// are removed after the join. If the roster repeats an id, the first entry
/// wins; `ReferenceData` rejects such rosters before they get here.
pub fn enrich(shifts: &[Shift], residents: &[Resident], exclude_unmatched: bool) -> Vec<EnrichedShift> {
    let mut years: HashMap<&str, Option<u8>> = HashMap::with_capacity(residents.len());
    for resident in residents {
        years
            .entry(resident.resident_id.as_str())
            .or_insert(resident.training_year);
    }

    let joined = shifts.iter().map(|shift| EnrichedShift {
        training_year: years.get(shift.resident_id.as_str()).copied().flatten(),
        shift: shift.clone(),
    });

    if exclude_unmatched {
        joined.filter(|row| row.training_year.is_some()).collect()
    } else {
        joined.collect()
    }
}

/// `enrich` against a session's reference snapshot.
pub fn enrich_with_reference(
    shifts: &[Shift],
    reference: &ReferenceData,
    exclude_unmatched: bool,
) -> Vec<EnrichedShift> {
    enrich(shifts, reference.residents(), exclude_unmatched)
}

/// How many enriched rows found a training year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCounts {
    pub matched: usize,
    pub unmatched: usize,
}

pub fn match_counts(rows: &[EnrichedShift]) -> MatchCounts {
    let matched = rows.iter().filter(|r| r.training_year.is_some()).count();
    MatchCounts { matched, unmatched: rows.len() - matched }
}
