//! Session context.
//!
//! A `Session` owns everything one dashboard user's queries share: the API
//! settings, the transport, and the reference tables loaded at startup. The
//! tables are passed into the pipeline explicitly on every query and are
//! only ever replaced as a whole.

use crate::analysis::enrich::{enrich_with_reference, match_counts};
use crate::calendar::AcademicYearStart;
use crate::config::{ApiConfig, Config, DashboardConfig};
use crate::ingest::directory::{directory, FeedDirectory};
use crate::ingest::shiftadmin::{fetch_schedule, normalize};
use crate::ingest::transport::Transport;
use crate::logging::{self, DataSource};
use crate::model::{DateRange, EnrichedShift, ScheduleError};
use crate::reference::{load_block_dates, load_residents, ReferenceData, ReferenceError};

pub struct Session<T: Transport> {
    api: ApiConfig,
    dashboard: DashboardConfig,
    reference: ReferenceData,
    transport: T,
}

impl<T: Transport> Session<T> {
    pub fn new(api: ApiConfig, dashboard: DashboardConfig, reference: ReferenceData, transport: T) -> Self {
        Self { api, dashboard, reference, transport }
    }

    /// Build a session from a loaded config, reading both reference files.
    pub fn from_config(config: Config, transport: T) -> Result<Self, ReferenceError> {
        let reference = load_reference(&config)?;
        Ok(Self::new(config.api, config.dashboard, reference, transport))
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dashboard(&self) -> &DashboardConfig {
        &self.dashboard
    }

    pub fn academic_year_start(&self) -> AcademicYearStart {
        AcademicYearStart {
            month: self.dashboard.academic_year_start_month,
            day: self.dashboard.academic_year_start_day,
        }
    }

    /// Swap in freshly loaded reference tables. Returns the old snapshot.
    pub fn replace_reference(&mut self, reference: ReferenceData) -> ReferenceData {
        logging::info(
            DataSource::Reference,
            None,
            &format!(
                "Reference data replaced: {} blocks, {} residents",
                reference.blocks().len(),
                reference.residents().len()
            ),
        );
        std::mem::replace(&mut self.reference, reference)
    }

    /// Fetch, normalize and enrich the schedule for `range`.
    ///
    /// With `exclude_off_service`, rows without a roster class are dropped.
    /// Identical inputs give identical output; caching is up to the caller.
    pub fn load_schedule(
        &self,
        range: &DateRange,
        exclude_off_service: bool,
    ) -> Result<Vec<EnrichedShift>, ScheduleError> {
        let result = fetch_schedule(&self.transport, &self.api, range.start, range.end)
            .and_then(|raw| normalize(&raw));

        let shifts = match result {
            Ok(shifts) => shifts,
            Err(e) => {
                logging::log_schedule_failure(range, &e);
                return Err(e);
            }
        };

        let mut rows = enrich_with_reference(&shifts, &self.reference, false);
        let counts = match_counts(&rows);
        logging::log_load_summary(range, rows.len(), counts.matched, counts.unmatched);

        if exclude_off_service {
            rows.retain(|row| row.training_year.is_some());
        }
        Ok(rows)
    }

    /// Fetch the raw feed for `range` and fold it into lookup tables.
    /// Records are not normalized, so a bad timestamp does not fail this.
    pub fn load_directory(&self, range: &DateRange) -> Result<FeedDirectory, ScheduleError> {
        let raw = fetch_schedule(&self.transport, &self.api, range.start, range.end)
            .inspect_err(|e| logging::log_schedule_failure(range, e))?;
        Ok(directory(&raw))
    }
}

/// Read the block calendar and roster named in `config`.
pub fn load_reference(config: &Config) -> Result<ReferenceData, ReferenceError> {
    let blocks_path = &config.reference.block_dates;
    let residents_path = &config.reference.residents;

    let blocks = load_block_dates(blocks_path).inspect_err(|e| logging::log_reference_failure(blocks_path, e))?;
    let reference = load_residents(residents_path)
        .and_then(|residents| ReferenceData::new(blocks, residents))
        .inspect_err(|e| logging::log_reference_failure(residents_path, e))?;

    logging::info(
        DataSource::Reference,
        None,
        &format!(
            "Loaded {} blocks from {} and {} residents from {}",
            reference.blocks().len(),
            blocks_path.display(),
            reference.residents().len(),
            residents_path.display()
        ),
    );
    Ok(reference)
}
