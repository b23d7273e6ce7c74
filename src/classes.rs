use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::RawRow;

/// Whether the dataset supports comparing classes against each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Distinct class values of one loaded dataset.
///
/// Built from the unfiltered rows of a load and replaced wholesale on the
/// next one; filtered views never feed back into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassGate {
    column: Option<String>,
    classes: BTreeSet<String>,
}

impl ClassGate {
    pub fn from_rows(rows: &[RawRow], class_headers: &[String]) -> Self {
        let mut gate = Self::default();
        for row in rows {
            let Some((header, value)) = class_cell(row, class_headers) else {
                continue;
            };
            if gate.column.is_none() {
                gate.column = Some(header.to_string());
            }
            let value = value.trim();
            if !value.is_empty() {
                gate.classes.insert(value.to_string());
            }
        }
        gate
    }

    /// Builds the gate from already-aggregated class labels.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            column: (!classes.is_empty()).then(|| "klasse".to_string()),
            classes,
        }
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn availability(&self) -> Availability {
        let message = match (self.column.as_deref(), self.classes.len()) {
            (None, _) => Some("no class column found in the loaded data".to_string()),
            (Some(column), 0) => Some(format!("class column '{column}' is empty")),
            (Some(_), 1) => Some(format!(
                "only one class ({}) in the loaded data",
                self.classes.iter().next().map(String::as_str).unwrap_or_default()
            )),
            _ => None,
        };
        Availability {
            available: message.is_none(),
            message,
        }
    }
}

fn class_cell<'a>(row: &'a RawRow, class_headers: &[String]) -> Option<(&'a str, &'a str)> {
    class_headers.iter().find_map(|wanted| {
        row.iter()
            .find(|(header, _)| header.trim().eq_ignore_ascii_case(wanted.trim()))
            .map(|(header, value)| (header.as_str(), value.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    fn rows(header: &str, values: &[&str]) -> Vec<RawRow> {
        values
            .iter()
            .map(|value| {
                let mut row = RawRow::new();
                row.insert("Langname".to_string(), "Muster".to_string());
                row.insert(header.to_string(), value.to_string());
                row
            })
            .collect()
    }

    fn headers() -> Vec<String> {
        IngestConfig::default().class_headers
    }

    #[test]
    fn two_classes_enable_comparison() {
        let gate = ClassGate::from_rows(&rows("Klasse", &["5a", "5a", "5b"]), &headers());
        assert_eq!(gate.class_count(), 2);
        assert_eq!(gate.column(), Some("Klasse"));
        assert!(gate.availability().available);
        assert_eq!(gate.availability().message, None);
    }

    #[test]
    fn single_class_disables_comparison() {
        let gate = ClassGate::from_rows(&rows("Klasse", &["5a", "5a"]), &headers());
        let availability = gate.availability();
        assert!(!availability.available);
        assert!(availability.message.unwrap_or_default().contains("5a"));
    }

    #[test]
    fn header_match_ignores_case() {
        let gate = ClassGate::from_rows(&rows("KLASSEN", &["7b", "8c"]), &headers());
        assert_eq!(gate.classes().collect::<Vec<_>>(), vec!["7b", "8c"]);
    }

    #[test]
    fn blank_values_are_not_classes() {
        let gate = ClassGate::from_rows(&rows("class", &["5a", " ", "5a "]), &headers());
        assert_eq!(gate.class_count(), 1);
        assert!(!gate.availability().available);
    }

    #[test]
    fn missing_column_is_unavailable() {
        let gate = ClassGate::from_rows(&rows("Gruppe", &["5a", "5b"]), &headers());
        assert_eq!(gate.column(), None);
        let availability = gate.availability();
        assert!(!availability.available);
        assert!(availability.message.is_some());
    }

    #[test]
    fn labels_build_the_same_gate() {
        let gate = ClassGate::from_labels(["5a", "5b", "5a", ""]);
        assert_eq!(gate.class_count(), 2);
        assert!(gate.availability().available);
        assert!(!ClassGate::from_labels(["5a"]).availability().available);
    }
}
