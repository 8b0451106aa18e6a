//! Shift statistics from the command line.
//!
//! Loads the schedule for a date window and prints the headline report and
//! count tables, or the roster coverage check.
//!
//! **Usage:**
//! ```bash
//! shiftstats --config shiftstats.toml --block 3 --breakdown class-site --percent
//! shiftstats --start 2023-07-01 --end 2023-09-30 --json
//! shiftstats --replay saved_feed.json --coverage
//! shiftstats --ytd --directory
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Serialize;

use shiftstat_service::analysis::aggregate::{summarize, CountTable, Summary};
use shiftstat_service::analysis::breakdown::Breakdown;
use shiftstat_service::calendar::DateSelection;
use shiftstat_service::config::Config;
use shiftstat_service::ingest::transport::{HttpTransport, Transport};
use shiftstat_service::logging::{self, DataSource, LogLevel};
use shiftstat_service::model::DateRange;
use shiftstat_service::replay::ReplayTransport;
use shiftstat_service::report::overall_breakdown;
use shiftstat_service::session::Session;
use shiftstat_service::verify::{check_coverage, print_summary};

#[derive(Parser, Debug)]
#[command(name = "shiftstats")]
#[command(about = "Shift count statistics for the residency schedule")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "shiftstats.toml", value_name = "FILE")]
    config: PathBuf,

    /// First day of a custom window (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with_all = ["block", "ytd"])]
    start: Option<NaiveDate>,

    /// Last day of a custom window (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Use the bounds of one block from the block calendar
    #[arg(long, conflicts_with = "ytd")]
    block: Option<String>,

    /// Academic year to date (the default window)
    #[arg(long)]
    ytd: bool,

    /// Keep shifts worked by people missing from the roster
    #[arg(long)]
    include_off_service: bool,

    /// Tables to print, e.g. `site`, `class-time-of-day`, `resident-site:2`.
    /// Defaults to the class, time-of-day, site and resident overview.
    #[arg(long, value_name = "KIND")]
    breakdown: Vec<Breakdown>,

    /// Report percentages of each group's parent instead of counts
    #[arg(long)]
    percent: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Serve a saved feed file instead of calling the live API
    #[arg(long, value_name = "FEED_JSON")]
    replay: Option<PathBuf>,

    /// Print the roster coverage check instead of the tables
    #[arg(long, conflicts_with = "directory")]
    coverage: bool,

    /// Print the feed's group, user, facility and shift-area tables as JSON
    #[arg(long)]
    directory: bool,

    #[arg(long, default_value = "info")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn selection(&self) -> DateSelection {
        match (&self.block, self.start, self.end) {
            _ if self.ytd => DateSelection::YearToDate,
            (Some(block), _, _) => DateSelection::Block(block.clone()),
            (None, Some(start), Some(end)) => DateSelection::Custom { start, end },
            _ => DateSelection::YearToDate,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logger(args.log_level, args.log_json);

    let config = match &args.replay {
        Some(_) => Config::read(&args.config),
        None => Config::load(&args.config),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            logging::error(DataSource::System, Some(&args.config.display().to_string()), &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let transport: Box<dyn Transport> = match &args.replay {
        Some(path) => match ReplayTransport::from_file(path) {
            Ok(t) => {
                logging::info(DataSource::System, None, &format!("Replaying feed from {}", path.display()));
                Box::new(t)
            }
            Err(e) => {
                logging::error(DataSource::System, None, &e.to_string());
                return ExitCode::FAILURE;
            }
        },
        None => match HttpTransport::new() {
            Ok(t) => Box::new(t),
            Err(e) => {
                logging::error(DataSource::System, None, &e.to_string());
                return ExitCode::FAILURE;
            }
        },
    };

    let session = match Session::from_config(config, transport) {
        Ok(session) => session,
        Err(_) => return ExitCode::FAILURE,
    };

    let today = Local::now().date_naive();
    let range = match args.selection().resolve(session.reference(), today, session.academic_year_start()) {
        Ok(range) => range,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    if args.directory {
        return match session.load_directory(&range) {
            Ok(directory) => print_json(&directory),
            Err(e) => {
                eprintln!("{}", e.user_message());
                ExitCode::FAILURE
            }
        };
    }

    let exclude = session.dashboard().exclude_off_service && !args.include_off_service && !args.coverage;
    let rows = match session.load_schedule(&range, exclude) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    if args.coverage {
        let report = check_coverage(&rows, session.reference());
        if args.json {
            return print_json(&report);
        }
        print_summary(&report);
        return ExitCode::SUCCESS;
    }

    let breakdowns: Vec<Breakdown> = if args.breakdown.is_empty() {
        Breakdown::OVERVIEW.to_vec()
    } else {
        args.breakdown.clone()
    };

    if args.json {
        let tables = breakdowns
            .iter()
            .map(|b| TableOutput {
                breakdown: b.to_string(),
                title: b.title(),
                rows: b.run(&rows, args.percent).to_records(),
            })
            .collect();
        return print_json(&JsonOutput {
            range,
            summary: summarize(&rows, None),
            tables,
        });
    }

    println!("{}", overall_breakdown(&range, &rows));
    for breakdown in &breakdowns {
        println!();
        println!("{}", breakdown.title());
        print_table(&breakdown.run(&rows, args.percent));
    }
    ExitCode::SUCCESS
}

#[derive(Serialize)]
struct JsonOutput {
    range: DateRange,
    summary: Summary,
    tables: Vec<TableOutput>,
}

#[derive(Serialize)]
struct TableOutput {
    breakdown: String,
    title: String,
    rows: Vec<serde_json::Value>,
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(DataSource::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn print_table(table: &CountTable) {
    for row in &table.rows {
        let label: Vec<String> = row.key.iter().map(|v| v.to_string()).collect();
        match row.percent {
            Some(p) => println!("  {:<40} {:>6.1}%", label.join(" / "), p),
            None => println!("  {:<40} {:>6}", label.join(" / "), row.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("shiftstats").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_window_flags_means_year_to_date() {
        assert_eq!(parse(&[]).selection(), DateSelection::YearToDate);
    }

    #[test]
    fn test_ytd_flag_selects_year_to_date() {
        assert_eq!(parse(&["--ytd"]).selection(), DateSelection::YearToDate);
    }

    #[test]
    fn test_block_and_custom_windows() {
        assert_eq!(parse(&["--block", "3"]).selection(), DateSelection::Block("3".to_string()));
        assert_eq!(
            parse(&["--start", "2023-07-01", "--end", "2023-09-30"]).selection(),
            DateSelection::Custom {
                start: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
            }
        );
    }

    #[test]
    fn test_window_flags_are_exclusive() {
        let parse_err = |args: &[&str]| {
            Args::try_parse_from(std::iter::once("shiftstats").chain(args.iter().copied())).is_err()
        };
        assert!(parse_err(&["--ytd", "--block", "3"]));
        assert!(parse_err(&["--ytd", "--start", "2023-07-01", "--end", "2023-09-30"]));
        assert!(parse_err(&["--start", "2023-07-01"]));
        assert!(parse_err(&["--coverage", "--directory"]));
    }
}
