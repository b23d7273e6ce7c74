use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::StudentRow;
use crate::models::{SchoolYearStats, WeeklySeries, WeeklyStats};

/// Grand totals over the filtered students, shown as the table footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub student_count: usize,
    pub tardies_excused: u32,
    pub tardies_unexcused: u32,
    pub tardies_pending: u32,
    pub absences_excused: u32,
    pub absences_unexcused: u32,
    pub absences_pending: u32,
    pub school_year: SchoolYearStats,
    pub weekly_tardies: WeeklySeries,
    pub weekly_absences: WeeklySeries,
}

impl SummaryRow {
    pub fn weekly_tardies_display(&self) -> String {
        weekly_display(&self.weekly_tardies)
    }

    pub fn weekly_absences_display(&self) -> String {
        weekly_display(&self.weekly_absences)
    }
}

pub fn summarize(
    rows: &[StudentRow<'_>],
    school_year: &BTreeMap<String, SchoolYearStats>,
    weekly: &BTreeMap<String, WeeklyStats>,
    weeks: usize,
) -> SummaryRow {
    let zero_year = SchoolYearStats::default();
    let zero_weekly = WeeklyStats::zeroed(weeks);
    let mut summary = SummaryRow {
        student_count: rows.len(),
        weekly_tardies: WeeklySeries::zeroed(weeks),
        weekly_absences: WeeklySeries::zeroed(weeks),
        ..SummaryRow::default()
    };

    for row in rows {
        let stats = row.stats;
        add(&mut summary.tardies_excused, stats.tardies_excused);
        add(&mut summary.tardies_unexcused, stats.tardies_unexcused);
        add(&mut summary.tardies_pending, stats.tardies_pending);
        add(&mut summary.absences_excused, stats.absences_excused);
        add(&mut summary.absences_unexcused, stats.absences_unexcused);
        add(&mut summary.absences_pending, stats.absences_pending);

        let year = school_year.get(row.name).unwrap_or(&zero_year);
        add(&mut summary.school_year.tardies_unexcused, year.tardies_unexcused);
        add(&mut summary.school_year.absences_unexcused, year.absences_unexcused);
        add(&mut summary.school_year.absences_total, year.absences_total);

        let trend = weekly.get(row.name).unwrap_or(&zero_weekly);
        accumulate(&mut summary.weekly_tardies, &trend.tardies);
        accumulate(&mut summary.weekly_absences, &trend.absences);
    }

    summary
}

/// Adds `source` into `target` week by week. `target` already has the expected
/// length, so surplus weeks in `source` are dropped by the zip.
fn accumulate(target: &mut WeeklySeries, source: &WeeklySeries) {
    add(&mut target.total, source.total);
    for (slot, count) in target.weekly.iter_mut().zip(&source.weekly) {
        add(slot, *count);
    }
}

/// Counters saturate instead of wrapping on absurd inputs.
fn add(total: &mut u32, value: u32) {
    *total = total.saturating_add(value);
}

/// `total(newest, ..., oldest)`.
pub fn weekly_display(series: &WeeklySeries) -> String {
    let weeks: Vec<String> = series.weekly.iter().rev().map(u32::to_string).collect();
    format!("{}({})", series.total, weeks.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentStats;

    fn student(tardies_unexcused: u32) -> StudentStats {
        StudentStats {
            tardies_unexcused,
            absences_excused: 1,
            class: "5a".to_string(),
            ..StudentStats::default()
        }
    }

    fn series(weekly: &[u32]) -> WeeklySeries {
        WeeklySeries {
            total: weekly.iter().sum(),
            weekly: weekly.to_vec(),
        }
    }

    #[test]
    fn counters_sum_across_students() {
        let names = ["a", "b", "c"];
        let stats = [student(2), student(0), student(5)];
        let rows: Vec<StudentRow<'_>> = names
            .iter()
            .zip(stats.iter())
            .map(|(name, stats)| StudentRow { name, stats })
            .collect();

        let summary = summarize(&rows, &BTreeMap::new(), &BTreeMap::new(), 4);
        assert_eq!(summary.student_count, 3);
        assert_eq!(summary.tardies_unexcused, 7);
        assert_eq!(summary.absences_excused, 3);
        assert_eq!(summary.weekly_tardies.weekly, vec![0; 4]);
    }

    #[test]
    fn missing_school_year_counts_as_zero() {
        let stats = [student(1), student(1)];
        let rows = vec![
            StudentRow { name: "known", stats: &stats[0] },
            StudentRow { name: "unknown", stats: &stats[1] },
        ];
        let school_year = BTreeMap::from([(
            "known".to_string(),
            SchoolYearStats {
                tardies_unexcused: 9,
                absences_unexcused: 2,
                absences_total: 6,
            },
        )]);

        let summary = summarize(&rows, &school_year, &BTreeMap::new(), 2);
        assert_eq!(summary.school_year.tardies_unexcused, 9);
        assert_eq!(summary.school_year.absences_total, 6);
    }

    #[test]
    fn weekly_sums_are_index_wise_and_capped() {
        let stats = [student(0), student(0)];
        let rows = vec![
            StudentRow { name: "a", stats: &stats[0] },
            StudentRow { name: "b", stats: &stats[1] },
        ];
        let weekly = BTreeMap::from([
            (
                "a".to_string(),
                WeeklyStats {
                    tardies: series(&[1, 2, 3]),
                    absences: series(&[0, 0, 1]),
                },
            ),
            (
                "b".to_string(),
                WeeklyStats {
                    tardies: series(&[1, 1, 1, 9]),
                    absences: series(&[2]),
                },
            ),
        ]);

        let summary = summarize(&rows, &BTreeMap::new(), &weekly, 3);
        assert_eq!(summary.weekly_tardies.weekly, vec![2, 3, 4]);
        assert_eq!(summary.weekly_tardies.total, 18);
        assert_eq!(summary.weekly_absences.weekly, vec![2, 0, 1]);
        assert_eq!(summary.weekly_absences_display(), "3(1,0,2)");
    }

    #[test]
    fn huge_counters_saturate() {
        let stats = [student(3_000_000_000), student(3_000_000_000)];
        let rows = vec![
            StudentRow { name: "a", stats: &stats[0] },
            StudentRow { name: "b", stats: &stats[1] },
        ];
        let weekly = BTreeMap::from([
            (
                "a".to_string(),
                WeeklyStats {
                    tardies: series(&[u32::MAX]),
                    ..WeeklyStats::zeroed(1)
                },
            ),
            (
                "b".to_string(),
                WeeklyStats {
                    tardies: series(&[1]),
                    ..WeeklyStats::zeroed(1)
                },
            ),
        ]);

        let summary = summarize(&rows, &BTreeMap::new(), &weekly, 1);
        assert_eq!(summary.tardies_unexcused, u32::MAX);
        assert_eq!(summary.weekly_tardies.weekly, vec![u32::MAX]);
    }

    #[test]
    fn display_lists_newest_week_first() {
        assert_eq!(weekly_display(&series(&[1, 2, 3])), "6(3,2,1)");
        assert_eq!(weekly_display(&WeeklySeries::zeroed(0)), "0()");
    }
}
