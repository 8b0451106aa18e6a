//! Headline statistics text.
//!
//! Renders the overview paragraph shown above the charts: totals for the
//! window, then one bullet each for class, time of day and site.

use crate::analysis::aggregate::{summarize, CountTable, GroupValue};
use crate::analysis::breakdown::Breakdown;
use crate::model::{DateRange, EnrichedShift, Site, TimeOfDay};

/// Date format used in the headline ("07/01/23").
pub const REPORT_DATE_FORMAT: &str = "%m/%d/%y";

/// Markdown paragraph summarizing an enriched table.
///
/// Class percentages are shares of shifts with a known class. Time of day
/// and site always list every known value, with zero counts when absent.
pub fn overall_breakdown(range: &DateRange, rows: &[EnrichedShift]) -> String {
    let summary = summarize(rows, None);

    let mut text = format!(
        "Between **{}** and **{}**, there are **{}** shifts, totaling **{}** person-hours across **{}** residents.\n",
        range.start.format(REPORT_DATE_FORMAT),
        range.end.format(REPORT_DATE_FORMAT),
        summary.total_shifts,
        summary.person_hours.trunc() as i64,
        summary.distinct_residents
    );

    let by_class = Breakdown::ByClass.run(rows, false);
    let classed: Vec<(u8, usize)> = by_class
        .rows
        .iter()
        .filter_map(|r| match r.key.first() {
            Some(GroupValue::Class(Some(year))) => Some((*year, r.count)),
            _ => None,
        })
        .collect();
    let classed_total: usize = classed.iter().map(|(_, count)| count).sum();
    let class_parts: Vec<String> = classed
        .iter()
        .map(|(year, count)| {
            format!("**{}** ({:.0}%) are worked by PGY{}s", count, percent(*count, classed_total), year)
        })
        .collect();

    let by_time = Breakdown::ByTimeOfDay.run(rows, false);
    let time_parts: Vec<String> = TimeOfDay::ALL
        .iter()
        .map(|tod| {
            let count = count_of(&by_time, GroupValue::TimeOfDay(*tod));
            format!("**{}** ({:.0}%) are {} shifts", count, percent(count, rows.len()), tod)
        })
        .collect();

    let by_site = Breakdown::BySite.run(rows, false);
    let site_parts: Vec<String> = Site::KNOWN
        .iter()
        .map(|site| {
            let count = count_of(&by_site, GroupValue::Site(site.clone()));
            format!("**{}** ({:.0}%) are at {}", count, percent(count, rows.len()), site)
        })
        .collect();

    text.push_str(&format!("\t* By class, {}.\n", class_parts.join(", ")));
    text.push_str(&format!("\t* By time of day, {}.\n", time_parts.join(", ")));
    text.push_str(&format!("\t* By site, {}.", site_parts.join(", ")));
    text
}

fn count_of(table: &CountTable, value: GroupValue) -> usize {
    table.get(&[value]).map(|r| r.count).unwrap_or(0)
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Shift;
    use chrono::NaiveDate;

    fn row(resident_id: &str, year: Option<u8>, site: &str, hour: u32, hours: f64) -> EnrichedShift {
        let start = NaiveDate::from_ymd_opt(2023, 7, 3).unwrap().and_hms_opt(hour, 0, 0).unwrap();
        EnrichedShift {
            shift: Shift {
                id: format!("{}-{}", resident_id, hour),
                resident_id: resident_id.to_string(),
                display_name: format!("R {}", resident_id),
                first_name: "R".to_string(),
                last_name: resident_id.to_string(),
                site: Site::from_code(site),
                shift_code: format!("{}-A", site),
                group: "EM".to_string(),
                group_id: "1".to_string(),
                facility_id: "1".to_string(),
                start,
                end: start + chrono::Duration::minutes((hours * 60.0) as i64),
                length_hours: hours,
                time_of_day: TimeOfDay::from_hour(hour),
            },
            training_year: year,
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 7, 31).unwrap(),
        )
    }

    #[test]
    fn test_headline_for_single_resident() {
        let rows = vec![
            row("7", Some(2), "UM", 7, 8.0),
            row("7", Some(2), "UM", 9, 8.0),
            row("7", Some(2), "SJ", 15, 10.0),
            row("7", Some(2), "HMC", 23, 10.0),
        ];
        let text = overall_breakdown(&range(), &rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Between **07/01/23** and **07/31/23**, there are **4** shifts, totaling **36** person-hours across **1** residents."
        );
        assert_eq!(lines[1], "\t* By class, **4** (100%) are worked by PGY2s.");
        assert_eq!(
            lines[2],
            "\t* By time of day, **2** (50%) are Morning shifts, **1** (25%) are Evening shifts, **1** (25%) are Night shifts."
        );
        assert_eq!(lines[3], "\t* By site, **2** (50%) are at UM, **1** (25%) are at SJ, **1** (25%) are at HMC.");
    }

    #[test]
    fn test_person_hours_are_truncated() {
        let rows = vec![row("1", Some(1), "UM", 7, 8.5), row("2", Some(3), "UM", 7, 8.75)];
        let text = overall_breakdown(&range(), &rows);
        assert!(text.contains("totaling **17** person-hours across **2** residents"));
    }

    #[test]
    fn test_class_shares_ignore_unclassed_rows() {
        let rows = vec![row("1", Some(1), "UM", 7, 8.0), row("9", None, "UM", 7, 8.0)];
        let text = overall_breakdown(&range(), &rows);
        assert!(text.contains("By class, **1** (100%) are worked by PGY1s."));
        assert!(text.contains("**2** (100%) are at UM"));
    }

    #[test]
    fn test_empty_table_reports_zeros() {
        let text = overall_breakdown(&range(), &[]);
        assert!(text.contains("there are **0** shifts"));
        assert!(text.contains("**0** (0%) are Morning shifts"));
    }
}
