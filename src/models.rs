use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One ingested row: column header to cell text.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn is_selected(&self) -> bool {
        !self.start.trim().is_empty() && !self.end.trim().is_empty()
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((parse_date(&self.start)?, parse_date(&self.end)?))
    }

    pub fn label(&self) -> String {
        match self.bounds() {
            Some((start, end)) => format!(
                "{} to {}",
                start.format("%d.%m.%Y"),
                end.format("%d.%m.%Y")
            ),
            None => format!("{} to {}", self.start.trim(), self.end.trim()),
        }
    }
}

/// Accepts ISO dates and the German `DD.MM.YYYY` form used by the exports.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "entschuldigt", alias = "entsch")]
    Excused,
    #[serde(rename = "unentschuldigt", alias = "unentsch")]
    Unexcused,
    #[serde(rename = "offen")]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceEntry {
    #[serde(rename = "datum")]
    pub date: String,
    #[serde(rename = "art")]
    pub kind: String,
    #[serde(rename = "beginnZeit", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "endZeit", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(rename = "grund", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentStats {
    #[serde(rename = "verspaetungen_entsch")]
    pub tardies_excused: u32,
    #[serde(rename = "verspaetungen_unentsch")]
    pub tardies_unexcused: u32,
    #[serde(rename = "verspaetungen_offen")]
    pub tardies_pending: u32,
    #[serde(rename = "fehlzeiten_entsch")]
    pub absences_excused: u32,
    #[serde(rename = "fehlzeiten_unentsch")]
    pub absences_unexcused: u32,
    #[serde(rename = "fehlzeiten_offen")]
    pub absences_pending: u32,
    #[serde(rename = "klasse")]
    pub class: String,
}

impl StudentStats {
    pub fn tardies(&self) -> u32 {
        self.tardies_excused
            .saturating_add(self.tardies_unexcused)
            .saturating_add(self.tardies_pending)
    }

    pub fn absences(&self) -> u32 {
        self.absences_excused
            .saturating_add(self.absences_unexcused)
            .saturating_add(self.absences_pending)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedStats {
    #[serde(rename = "verspaetungen_entsch")]
    pub tardies_excused: Vec<AbsenceEntry>,
    #[serde(rename = "verspaetungen_unentsch")]
    pub tardies_unexcused: Vec<AbsenceEntry>,
    #[serde(rename = "verspaetungen_offen")]
    pub tardies_pending: Vec<AbsenceEntry>,
    #[serde(rename = "fehlzeiten_entsch")]
    pub absences_excused: Vec<AbsenceEntry>,
    #[serde(rename = "fehlzeiten_unentsch")]
    pub absences_unexcused: Vec<AbsenceEntry>,
    #[serde(rename = "fehlzeiten_offen")]
    pub absences_pending: Vec<AbsenceEntry>,
}

impl DetailedStats {
    pub fn tardy_entries(&self) -> usize {
        self.tardies_excused.len() + self.tardies_unexcused.len() + self.tardies_pending.len()
    }

    pub fn absence_entries(&self) -> usize {
        self.absences_excused.len() + self.absences_unexcused.len() + self.absences_pending.len()
    }

    /// The six buckets in display order, labelled.
    pub fn buckets(&self) -> [(&'static str, &[AbsenceEntry]); 6] {
        [
            ("Tardies, unexcused", self.tardies_unexcused.as_slice()),
            ("Tardies, pending", self.tardies_pending.as_slice()),
            ("Tardies, excused", self.tardies_excused.as_slice()),
            ("Absences, unexcused", self.absences_unexcused.as_slice()),
            ("Absences, pending", self.absences_pending.as_slice()),
            ("Absences, excused", self.absences_excused.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolYearStats {
    #[serde(rename = "verspaetungen_unentsch")]
    pub tardies_unexcused: u32,
    #[serde(rename = "fehlzeiten_unentsch")]
    pub absences_unexcused: u32,
    #[serde(rename = "fehlzeiten_gesamt")]
    pub absences_total: u32,
}

/// Weekly counts ordered oldest to newest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySeries {
    pub total: u32,
    pub weekly: Vec<u32>,
}

impl WeeklySeries {
    pub fn zeroed(weeks: usize) -> Self {
        Self {
            total: 0,
            weekly: vec![0; weeks],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyStats {
    #[serde(rename = "verspaetungen")]
    pub tardies: WeeklySeries,
    #[serde(rename = "fehlzeiten")]
    pub absences: WeeklySeries,
}

impl WeeklyStats {
    pub fn zeroed(weeks: usize) -> Self {
        Self {
            tardies: WeeklySeries::zeroed(weeks),
            absences: WeeklySeries::zeroed(weeks),
        }
    }
}

/// Output of the external aggregation step, keyed by student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessedData {
    pub student_stats: BTreeMap<String, StudentStats>,
    pub detailed_stats: BTreeMap<String, DetailedStats>,
    pub school_year_details: BTreeMap<String, SchoolYearStats>,
    pub weekly_details: BTreeMap<String, WeeklyStats>,
}
