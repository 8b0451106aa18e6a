/// Reference tables for the residency program: the block calendar and the
/// resident roster.
///
/// Both are small static CSV files maintained by the program office. They
/// are loaded once per session into a `ReferenceData` value, which is passed
/// explicitly to everything that needs it and never mutated. To pick up
/// edited files, load a fresh `ReferenceData` and drop the old one.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{BlockDate, Resident, TRAINING_YEARS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{table}: file is empty")]
    Empty { table: &'static str },
    #[error("{table}: missing required column {column:?}")]
    MissingColumn { table: &'static str, column: &'static str },
    #[error("{table} line {line}: invalid date {value:?}")]
    InvalidDate { table: &'static str, line: usize, value: String },
    #[error("residents line {line}: invalid training year {value:?}")]
    InvalidTrainingYear { line: usize, value: String },
    #[error("block {block_id}: end date {end} precedes start date {start}")]
    InvalidBlockRange { block_id: String, start: NaiveDate, end: NaiveDate },
    #[error("block {0} appears more than once")]
    DuplicateBlock(String),
    #[error("resident id {0} appears more than once in the roster")]
    DuplicateResident(String),
}

// ---------------------------------------------------------------------------
// CSV handling
// ---------------------------------------------------------------------------

/// Splits one CSV line into fields, honoring double-quoted fields and `""`
/// escapes. Fields are trimmed.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// A parsed CSV file: header row plus data rows tagged with their 1-based
/// line numbers.
struct CsvTable {
    table: &'static str,
    headers: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    fn parse(table: &'static str, text: &str) -> Result<Self, ReferenceError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_start_matches('\u{feff}')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().ok_or(ReferenceError::Empty { table })?;
        let headers = split_csv_line(header)
            .into_iter()
            .map(|h| normalize_header(&h))
            .collect();
        let rows = lines.map(|(n, line)| (n, split_csv_line(line))).collect();

        Ok(Self { table, headers, rows })
    }

    /// Index of the first header matching any alias.
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| *h == normalize_header(alias)))
    }

    fn require(&self, column: &'static str, aliases: &[&str]) -> Result<usize, ReferenceError> {
        self.find(aliases).ok_or(ReferenceError::MissingColumn { table: self.table, column })
    }
}

/// Case-, space-, dash- and underscore-insensitive header key.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Parses `YYYY-MM-DD`, `MM/DD/YYYY` or `MM/DD/YY`. A trailing time part
/// (`2023-07-01 00:00:00`) is ignored.
fn parse_reference_date(value: &str) -> Option<NaiveDate> {
    let value = value.split_whitespace().next()?;
    if value.contains('/') {
        let year_digits = value.rsplit('/').next().map(str::len).unwrap_or(0);
        let format = if year_digits == 4 { "%m/%d/%Y" } else { "%m/%d/%y" };
        NaiveDate::parse_from_str(value, format).ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
    }
}

fn date_cell(table: &'static str, line: usize, row: &[String], col: usize) -> Result<NaiveDate, ReferenceError> {
    let value = cell(row, col);
    parse_reference_date(value).ok_or_else(|| ReferenceError::InvalidDate {
        table,
        line,
        value: value.to_string(),
    })
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("na")
}

fn parse_training_year(line: usize, value: &str) -> Result<Option<u8>, ReferenceError> {
    if is_missing(value) {
        return Ok(None);
    }
    let invalid = || ReferenceError::InvalidTrainingYear { line, value: value.to_string() };

    // Spreadsheet exports write "2.0" for integer columns with blanks.
    let year: f64 = value.parse().map_err(|_| invalid())?;
    if year.fract() != 0.0 || year < 0.0 || year > u8::MAX as f64 {
        return Err(invalid());
    }
    let year = year as u8;
    if !TRAINING_YEARS.contains(&year) {
        return Err(invalid());
    }
    Ok(Some(year))
}

fn read_file(path: &Path) -> Result<String, ReferenceError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Block dates
// ---------------------------------------------------------------------------

/// Parse the block calendar. Rows keep file order.
pub fn parse_block_dates(text: &str) -> Result<Vec<BlockDate>, ReferenceError> {
    const TABLE: &str = "block dates";
    let csv = CsvTable::parse(TABLE, text)?;

    let block_col = csv.require("Block", &["Block", "block_id"])?;
    let start_col = csv.require("Start Date", &["Start Date", "start_date"])?;
    let end_col = csv.require("End Date", &["End Date", "end_date"])?;
    let mid_col = csv.find(&["Mid-transition Start Date", "Mid-Block Transition Date", "mid_transition"]);

    let mut blocks: Vec<BlockDate> = Vec::with_capacity(csv.rows.len());
    for (line, row) in &csv.rows {
        let block_id = cell(row, block_col).to_string();
        let start_date = date_cell(TABLE, *line, row, start_col)?;
        let end_date = date_cell(TABLE, *line, row, end_col)?;

        let mid_transition = match mid_col {
            Some(col) if !is_missing(cell(row, col)) => Some(date_cell(TABLE, *line, row, col)?),
            _ => None,
        };

        if end_date < start_date {
            return Err(ReferenceError::InvalidBlockRange { block_id, start: start_date, end: end_date });
        }
        if blocks.iter().any(|b| b.block_id == block_id) {
            return Err(ReferenceError::DuplicateBlock(block_id));
        }

        blocks.push(BlockDate { block_id, start_date, end_date, mid_transition });
    }

    Ok(blocks)
}

pub fn load_block_dates(path: impl AsRef<Path>) -> Result<Vec<BlockDate>, ReferenceError> {
    parse_block_dates(&read_file(path.as_ref())?)
}

// ---------------------------------------------------------------------------
// Residents
// ---------------------------------------------------------------------------

/// Parse the resident roster. Rows keep file order.
///
/// Duplicate resident ids are rejected when the roster is assembled into
/// `ReferenceData`, not here.
pub fn parse_residents(text: &str) -> Result<Vec<Resident>, ReferenceError> {
    let csv = CsvTable::parse("residents", text)?;

    let id_col = csv.require("userID", &["userID", "resident_id", "id"])?;
    let year_col = csv.require("pgy", &["pgy", "training_year"])?;
    let first_col = csv.find(&["First Name", "firstName", "first_name"]);
    let last_col = csv.find(&["Last Name", "lastName", "last_name"]);

    csv.rows
        .iter()
        .map(|(line, row)| -> Result<Resident, ReferenceError> {
            Ok(Resident {
                resident_id: cell(row, id_col).to_string(),
                first_name: first_col.map(|c| cell(row, c).to_string()).unwrap_or_default(),
                last_name: last_col.map(|c| cell(row, c).to_string()).unwrap_or_default(),
                training_year: parse_training_year(*line, cell(row, year_col))?,
            })
        })
        .collect()
}

pub fn load_residents(path: impl AsRef<Path>) -> Result<Vec<Resident>, ReferenceError> {
    parse_residents(&read_file(path.as_ref())?)
}

// ---------------------------------------------------------------------------
// Session reference context
// ---------------------------------------------------------------------------

/// Immutable snapshot of both reference tables for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    blocks: Vec<BlockDate>,
    residents: Vec<Resident>,
    resident_index: HashMap<String, usize>,
}

impl ReferenceData {
    /// Assemble the context, failing fast on duplicate roster ids.
    pub fn new(blocks: Vec<BlockDate>, residents: Vec<Resident>) -> Result<Self, ReferenceError> {
        let mut resident_index = HashMap::with_capacity(residents.len());
        for (i, resident) in residents.iter().enumerate() {
            if resident_index.insert(resident.resident_id.clone(), i).is_some() {
                return Err(ReferenceError::DuplicateResident(resident.resident_id.clone()));
            }
        }
        Ok(Self { blocks, residents, resident_index })
    }

    /// Load both reference files.
    pub fn load(
        block_dates: impl AsRef<Path>,
        residents: impl AsRef<Path>,
    ) -> Result<Self, ReferenceError> {
        Self::new(load_block_dates(block_dates)?, load_residents(residents)?)
    }

    pub fn blocks(&self) -> &[BlockDate] {
        &self.blocks
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    /// Looks up a resident by id. Returns `None` if not on the roster.
    pub fn find_resident(&self, resident_id: &str) -> Option<&Resident> {
        self.resident_index.get(resident_id).map(|&i| &self.residents[i])
    }

    /// Looks up a block by id. Returns `None` if not found.
    pub fn find_block(&self, block_id: &str) -> Option<&BlockDate> {
        self.blocks.iter().find(|b| b.block_id == block_id)
    }

    /// First block in calendar order whose bounds include `date`.
    pub fn block_containing(&self, date: NaiveDate) -> Option<&BlockDate> {
        self.blocks.iter().find(|b| b.contains(date))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
