use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;

use crate::models::{ProcessedData, WeeklySeries, WeeklyStats};

/// One broken invariant in a processed dataset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataIssue {
    #[error("{student}: present in {present_in} but missing from {missing_from}")]
    MissingStudent {
        student: String,
        present_in: &'static str,
        missing_from: &'static str,
    },
    #[error("{student}: {kind} counters sum to {counted} but {listed} entries are listed")]
    BucketMismatch {
        student: String,
        kind: &'static str,
        counted: u32,
        listed: usize,
    },
    #[error("{student}: weekly {kind} series has {len} weeks, expected {expected}")]
    WeekLength {
        student: String,
        kind: &'static str,
        len: usize,
        expected: usize,
    },
}

pub fn load(path: &Path) -> anyhow::Result<ProcessedData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: ProcessedData = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse processed data in {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        students = data.student_stats.len(),
        "loaded processed data"
    );
    Ok(data)
}

impl ProcessedData {
    /// Sorted distinct class labels over every student.
    pub fn classes(&self) -> Vec<&str> {
        self.student_stats
            .values()
            .map(|stats| stats.class.trim())
            .filter(|class| !class.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Longest weekly series in the data.
    pub fn week_count(&self) -> usize {
        self.weekly_details
            .values()
            .flat_map(|w| [w.tardies.weekly.len(), w.absences.weekly.len()])
            .max()
            .unwrap_or(0)
    }

    /// Collects every violation; an empty result means the data is consistent.
    pub fn validate(&self, weeks: usize) -> Vec<DataIssue> {
        let mut issues = Vec::new();

        let maps: [(&'static str, BTreeSet<&str>); 4] = [
            ("studentStats", self.student_stats.keys().map(String::as_str).collect()),
            ("detailedStats", self.detailed_stats.keys().map(String::as_str).collect()),
            (
                "schoolYearDetails",
                self.school_year_details.keys().map(String::as_str).collect(),
            ),
            ("weeklyDetails", self.weekly_details.keys().map(String::as_str).collect()),
        ];
        let (reference_name, reference) = &maps[0];
        for (name, keys) in &maps[1..] {
            for student in reference.difference(keys) {
                issues.push(DataIssue::MissingStudent {
                    student: student.to_string(),
                    present_in: *reference_name,
                    missing_from: *name,
                });
            }
            for student in keys.difference(reference) {
                issues.push(DataIssue::MissingStudent {
                    student: student.to_string(),
                    present_in: *name,
                    missing_from: *reference_name,
                });
            }
        }

        for (student, stats) in &self.student_stats {
            let Some(details) = self.detailed_stats.get(student) else {
                continue;
            };
            let checks = [
                ("tardy", stats.tardies(), details.tardy_entries()),
                ("absence", stats.absences(), details.absence_entries()),
            ];
            for (kind, counted, listed) in checks {
                if counted as usize != listed {
                    issues.push(DataIssue::BucketMismatch {
                        student: student.clone(),
                        kind,
                        counted,
                        listed,
                    });
                }
            }
        }

        for (student, trend) in &self.weekly_details {
            for (kind, series) in [("tardy", &trend.tardies), ("absence", &trend.absences)] {
                if series.weekly.len() != weeks {
                    issues.push(DataIssue::WeekLength {
                        student: student.clone(),
                        kind,
                        len: series.weekly.len(),
                        expected: weeks,
                    });
                }
            }
        }

        issues
    }

    /// Brings every weekly series up to `weeks` entries by prepending zeros for
    /// the missing oldest weeks. Longer series are kept as they are.
    pub fn pad_weeks(&mut self, weeks: usize) {
        for student in self.student_stats.keys() {
            self.weekly_details
                .entry(student.clone())
                .or_insert_with(|| WeeklyStats::zeroed(weeks));
        }
        for trend in self.weekly_details.values_mut() {
            pad_series(&mut trend.tardies, weeks);
            pad_series(&mut trend.absences, weeks);
        }
    }
}

fn pad_series(series: &mut WeeklySeries, weeks: usize) {
    let missing = weeks.saturating_sub(series.weekly.len());
    if missing > 0 {
        let mut padded = vec![0; missing];
        padded.append(&mut series.weekly);
        series.weekly = padded;
    }
}
