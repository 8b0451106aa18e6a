//! Schedule ingestion from the ShiftAdmin scheduling API.
//!
//! - `transport`: the single outbound HTTP call, behind a trait so the
//!   fetcher can be driven by a saved feed or a test double.
//! - `directory`: deduplicated group, user, facility and shift-area tables
//!   built from the raw feed.
//! - `shiftadmin`: request building, response validation, and
//!   normalization of raw records into canonical `Shift`s.

pub mod directory;
pub mod shiftadmin;
pub mod transport;
