use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

use crate::classes::Availability;
use crate::filter::StudentRow;
use crate::models::{AbsenceEntry, DateRange, DetailedStats, ProcessedData, SchoolYearStats, WeeklyStats};
use crate::summary::{self, SummaryRow};

/// Everything the report shows besides the student rows themselves.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub range: Option<&'a DateRange>,
    pub weeks: usize,
    pub comparison: &'a Availability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentLine {
    pub name: String,
    pub class: String,
    pub tardies_excused: u32,
    pub tardies_unexcused: u32,
    pub tardies_pending: u32,
    pub absences_excused: u32,
    pub absences_unexcused: u32,
    pub absences_pending: u32,
    pub school_year: SchoolYearStats,
    pub weekly_tardies: String,
    pub weekly_absences: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTotals {
    pub class: String,
    pub students: usize,
    pub tardies_unexcused: u32,
    pub absences_unexcused: u32,
    pub absences: u32,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    range: Option<&'a DateRange>,
    weeks: usize,
    students: Vec<StudentLine>,
    summary: SummaryRow,
    class_comparison: &'a Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    classes: Option<Vec<ClassTotals>>,
}

pub fn student_lines(
    rows: &[StudentRow<'_>],
    data: &ProcessedData,
    weeks: usize,
) -> Vec<StudentLine> {
    let zero_weekly = WeeklyStats::zeroed(weeks);
    rows.iter()
        .map(|row| {
            let stats = row.stats;
            let trend = data.weekly_details.get(row.name).unwrap_or(&zero_weekly);
            StudentLine {
                name: row.name.to_string(),
                class: stats.class.clone(),
                tardies_excused: stats.tardies_excused,
                tardies_unexcused: stats.tardies_unexcused,
                tardies_pending: stats.tardies_pending,
                absences_excused: stats.absences_excused,
                absences_unexcused: stats.absences_unexcused,
                absences_pending: stats.absences_pending,
                school_year: data
                    .school_year_details
                    .get(row.name)
                    .cloned()
                    .unwrap_or_default(),
                weekly_tardies: summary::weekly_display(&trend.tardies),
                weekly_absences: summary::weekly_display(&trend.absences),
            }
        })
        .collect()
}

pub fn summarize_by_class(rows: &[StudentRow<'_>]) -> Vec<ClassTotals> {
    let mut map: HashMap<&str, ClassTotals> = HashMap::new();

    for row in rows {
        let class = row.stats.class.trim();
        let entry = map.entry(class).or_insert_with(|| ClassTotals {
            class: class.to_string(),
            students: 0,
            tardies_unexcused: 0,
            absences_unexcused: 0,
            absences: 0,
        });
        entry.students += 1;
        entry.tardies_unexcused = entry
            .tardies_unexcused
            .saturating_add(row.stats.tardies_unexcused);
        entry.absences_unexcused = entry
            .absences_unexcused
            .saturating_add(row.stats.absences_unexcused);
        entry.absences = entry.absences.saturating_add(row.stats.absences());
    }

    let mut totals: Vec<ClassTotals> = map.into_values().collect();
    totals.sort_by(|a, b| a.class.cmp(&b.class));
    totals
}

/// Escapes pipes and flattens line breaks so a value stays inside its cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace("\r\n", " ").replace(['\r', '\n'], " ")
}

pub fn build_report(ctx: &ReportContext<'_>, rows: &[StudentRow<'_>], data: &ProcessedData) -> String {
    let totals = summary::summarize(rows, &data.school_year_details, &data.weekly_details, ctx.weeks);
    let lines = student_lines(rows, data, ctx.weeks);

    let mut output = String::new();
    let _ = writeln!(output, "# Attendance Report");
    match ctx.range {
        Some(range) => {
            let _ = writeln!(output, "Range {} ({} weeks)", range.label(), ctx.weeks);
        }
        None => {
            let _ = writeln!(output, "All loaded data ({} weeks)", ctx.weeks);
        }
    }
    let _ = writeln!(
        output,
        "Showing {} of {} students",
        rows.len(),
        data.student_stats.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if lines.is_empty() {
        let _ = writeln!(output, "No students match the current filters.");
    } else {
        let _ = writeln!(
            output,
            "| Student | Class | Tardies exc. | Tardies unexc. | Tardies pending \
             | Absences exc. | Absences unexc. | Absences pending \
             | Year tardies unexc. | Year absences unexc. | Year absences \
             | Tardies per week | Absences per week |"
        );
        let _ = writeln!(output, "|{}", "---|".repeat(13));
        for line in &lines {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                cell(&line.name),
                cell(&line.class),
                line.tardies_excused,
                line.tardies_unexcused,
                line.tardies_pending,
                line.absences_excused,
                line.absences_unexcused,
                line.absences_pending,
                line.school_year.tardies_unexcused,
                line.school_year.absences_unexcused,
                line.school_year.absences_total,
                line.weekly_tardies,
                line.weekly_absences
            );
        }
        let _ = writeln!(
            output,
            "| **Total** | | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            totals.tardies_excused,
            totals.tardies_unexcused,
            totals.tardies_pending,
            totals.absences_excused,
            totals.absences_unexcused,
            totals.absences_pending,
            totals.school_year.tardies_unexcused,
            totals.school_year.absences_unexcused,
            totals.school_year.absences_total,
            totals.weekly_tardies_display(),
            totals.weekly_absences_display()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Comparison");

    if !ctx.comparison.available {
        let _ = writeln!(
            output,
            "Not available: {}.",
            ctx.comparison.message.as_deref().unwrap_or("unknown reason")
        );
    } else {
        for class in summarize_by_class(rows) {
            let _ = writeln!(
                output,
                "- {}: {} students, {} unexcused tardies, {} unexcused absences, {} absences",
                class.class,
                class.students,
                class.tardies_unexcused,
                class.absences_unexcused,
                class.absences
            );
        }
    }

    output
}

pub fn build_json(
    ctx: &ReportContext<'_>,
    rows: &[StudentRow<'_>],
    data: &ProcessedData,
) -> serde_json::Result<String> {
    let report = JsonReport {
        range: ctx.range,
        weeks: ctx.weeks,
        students: student_lines(rows, data, ctx.weeks),
        summary: summary::summarize(rows, &data.school_year_details, &data.weekly_details, ctx.weeks),
        class_comparison: ctx.comparison,
        classes: ctx.comparison.available.then(|| summarize_by_class(rows)),
    };
    serde_json::to_string_pretty(&report)
}

fn describe_entry(entry: &AbsenceEntry) -> String {
    let mut text = format!("{} {}", entry.date, entry.kind);
    match (entry.start_time.as_deref(), entry.end_time.as_deref()) {
        (Some(start), Some(end)) => {
            let _ = write!(text, " {start}-{end}");
        }
        (Some(time), None) | (None, Some(time)) => {
            let _ = write!(text, " {time}");
        }
        (None, None) => {}
    }
    if let Some(reason) = entry.reason.as_deref().filter(|r| !r.trim().is_empty()) {
        let _ = write!(text, " ({reason})");
    }
    text
}

/// Lists every entry of one student, bucket by bucket.
pub fn render_details(name: &str, details: &DetailedStats) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {name}");

    for (label, entries) in details.buckets() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {label} ({})", entries.len());
        if entries.is_empty() {
            let _ = writeln!(output, "None.");
        }
        for entry in entries {
            let _ = writeln!(output, "- {}", describe_entry(entry));
        }
    }

    output
}
