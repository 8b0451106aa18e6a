//! Shift table analysis for the statistics dashboard.
//!
//! Everything here is a pure function of its inputs: the same shifts and
//! roster always produce the same tables, in the same order, so callers may
//! memoize on (date range, reference snapshot).
//!
//! Submodules:
//! - `enrich`: left-joins normalized shifts against the resident roster.
//! - `aggregate`: grouped counts, percentages and headline totals.
//! - `breakdown`: the fixed set of chart breakdowns, one aggregation each.

pub mod aggregate;
pub mod breakdown;
pub mod enrich;
