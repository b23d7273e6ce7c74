use std::collections::BTreeMap;

use clap::ValueEnum;

use crate::models::StudentStats;

/// A student that survived filtering, borrowed from the processed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentRow<'a> {
    pub name: &'a str,
    pub stats: &'a StudentStats,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    /// Empty means every class.
    pub classes: Vec<String>,
    pub search: Option<String>,
    pub min_unexcused_tardies: Option<u32>,
    pub min_unexcused_absences: Option<u32>,
}

impl StudentFilter {
    pub fn matches(&self, name: &str, stats: &StudentStats) -> bool {
        if !self.classes.is_empty()
            && !self
                .classes
                .iter()
                .any(|class| class.trim().to_lowercase() == stats.class.trim().to_lowercase())
        {
            return false;
        }

        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() && !name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }

        self.min_unexcused_tardies
            .map_or(true, |min| stats.tardies_unexcused >= min)
            && self
                .min_unexcused_absences
                .map_or(true, |min| stats.absences_unexcused >= min)
    }

    pub fn apply<'a>(&self, students: &'a BTreeMap<String, StudentStats>) -> Vec<StudentRow<'a>> {
        students
            .iter()
            .filter(|(name, stats)| self.matches(name, stats))
            .map(|(name, stats)| StudentRow { name, stats })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Class,
    TardiesExcused,
    TardiesUnexcused,
    TardiesPending,
    AbsencesExcused,
    AbsencesUnexcused,
    AbsencesPending,
}

fn counter(stats: &StudentStats, key: SortKey) -> Option<u32> {
    match key {
        SortKey::Name | SortKey::Class => None,
        SortKey::TardiesExcused => Some(stats.tardies_excused),
        SortKey::TardiesUnexcused => Some(stats.tardies_unexcused),
        SortKey::TardiesPending => Some(stats.tardies_pending),
        SortKey::AbsencesExcused => Some(stats.absences_excused),
        SortKey::AbsencesUnexcused => Some(stats.absences_unexcused),
        SortKey::AbsencesPending => Some(stats.absences_pending),
    }
}

/// Sorts by `key`; ties fall back to the name, always ascending.
pub fn sort_rows(rows: &mut [StudentRow<'_>], key: SortKey, descending: bool) {
    rows.sort_by(|a, b| {
        let primary = match key {
            SortKey::Name => a.name.cmp(b.name),
            SortKey::Class => a.stats.class.cmp(&b.stats.class),
            _ => counter(a.stats, key).cmp(&counter(b.stats, key)),
        };
        let primary = if descending { primary.reverse() } else { primary };
        primary.then_with(|| a.name.cmp(b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(class: &str, tardies_unexcused: u32, absences_unexcused: u32) -> StudentStats {
        StudentStats {
            tardies_unexcused,
            absences_unexcused,
            class: class.to_string(),
            ..StudentStats::default()
        }
    }

    fn sample() -> BTreeMap<String, StudentStats> {
        BTreeMap::from([
            ("Muster, Max".to_string(), stats("5a", 2, 0)),
            ("Doe, Jane".to_string(), stats("5b", 0, 4)),
            ("Klein, Lea".to_string(), stats("5a", 5, 1)),
            ("Berg, Tom".to_string(), stats("6c", 5, 3)),
        ])
    }

    fn names(rows: &[StudentRow<'_>]) -> Vec<String> {
        rows.iter().map(|row| row.name.to_string()).collect()
    }

    #[test]
    fn empty_filter_keeps_everyone() {
        let data = sample();
        assert_eq!(StudentFilter::default().apply(&data).len(), 4);
    }

    #[test]
    fn class_and_search_compose() {
        let data = sample();
        let filter = StudentFilter {
            classes: vec!["5A".to_string()],
            search: Some("kle".to_string()),
            ..StudentFilter::default()
        };
        assert_eq!(names(&filter.apply(&data)), vec!["Klein, Lea"]);
    }

    #[test]
    fn thresholds_must_all_hold() {
        let data = sample();
        let filter = StudentFilter {
            min_unexcused_tardies: Some(2),
            min_unexcused_absences: Some(1),
            ..StudentFilter::default()
        };
        assert_eq!(names(&filter.apply(&data)), vec!["Berg, Tom", "Klein, Lea"]);
    }

    #[test]
    fn blank_search_is_ignored() {
        let data = sample();
        let filter = StudentFilter {
            search: Some("  ".to_string()),
            ..StudentFilter::default()
        };
        assert_eq!(filter.apply(&data).len(), 4);
    }

    #[test]
    fn sorting_breaks_ties_by_name() {
        let data = sample();
        let mut rows = StudentFilter::default().apply(&data);

        sort_rows(&mut rows, SortKey::TardiesUnexcused, true);
        assert_eq!(
            names(&rows),
            vec!["Berg, Tom", "Klein, Lea", "Muster, Max", "Doe, Jane"]
        );

        sort_rows(&mut rows, SortKey::Class, false);
        assert_eq!(
            names(&rows),
            vec!["Klein, Lea", "Muster, Max", "Doe, Jane", "Berg, Tom"]
        );

        sort_rows(&mut rows, SortKey::Name, true);
        assert_eq!(
            names(&rows),
            vec!["Muster, Max", "Klein, Lea", "Doe, Jane", "Berg, Tom"]
        );
    }
}
