use std::path::Path;

use tracing::info;

use crate::classes::{Availability, ClassGate};
use crate::config::IngestConfig;
use crate::ingest::{self, IngestError, RowSet};
use crate::models::DateRange;

/// State of one loaded dataset.
///
/// Loading takes `&mut self`, so a second upload cannot start while one is in
/// flight. Every successful load re-sets rows and gate together; a failed load
/// keeps the previous dataset and gate.
#[derive(Debug, Default)]
pub struct DatasetSession {
    config: IngestConfig,
    rows: Option<RowSet>,
    gate: Option<ClassGate>,
}

impl DatasetSession {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            rows: None,
            gate: None,
        }
    }

    pub async fn load(&mut self, path: &Path, range: &DateRange) -> Result<&RowSet, IngestError> {
        let rows = ingest::ingest_file(path, range, &self.config).await?;
        Ok(self.replace(rows))
    }

    fn replace(&mut self, rows: RowSet) -> &RowSet {
        let gate = ClassGate::from_rows(&rows.rows, &self.config.class_headers);
        info!(
            rows = rows.rows.len(),
            classes = gate.class_count(),
            "dataset loaded"
        );
        self.gate = Some(gate);
        self.rows.insert(rows)
    }

    pub fn rows(&self) -> Option<&RowSet> {
        self.rows.as_ref()
    }

    pub fn class_gate(&self) -> Option<&ClassGate> {
        self.gate.as_ref()
    }

    pub fn comparison_availability(&self) -> Availability {
        match &self.gate {
            Some(gate) => gate.availability(),
            None => Availability {
                available: false,
                message: Some("no dataset loaded".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TWO_CLASSES: &str = "Langname;Vorname;Beginndatum;Klasse\n\
                               Muster;Max;01.10.2025;5a\n\
                               Doe;Jane;01.10.2025;5b\n";
    const ONE_CLASS: &str = "Langname\tVorname\tBeginndatum\tKlasse\n\
                             Muster\tMax\t01.10.2025\t5a\n\
                             Klein\tLea\t02.10.2025\t5a\n";

    fn range() -> DateRange {
        DateRange::new("01.09.2025", "31.10.2025")
    }

    fn export(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).expect("write export");
        path
    }

    #[test]
    fn nothing_loaded_means_unavailable() {
        let session = DatasetSession::default();
        assert!(session.rows().is_none());
        assert!(session.class_gate().is_none());
        let availability = session.comparison_availability();
        assert!(!availability.available);
        assert_eq!(availability.message.as_deref(), Some("no dataset loaded"));
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = export(&dir, "export.csv", TWO_CLASSES);

        let mut session = DatasetSession::new(IngestConfig::default());
        let rows = session.load(&path, &range()).await.expect("load");
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(
            session.class_gate().map(|gate| gate.classes().collect::<Vec<_>>()),
            Some(vec!["5a", "5b"])
        );
    }

    #[tokio::test]
    async fn every_load_replaces_the_gate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = export(&dir, "a.csv", TWO_CLASSES);
        let second = export(&dir, "b.csv", ONE_CLASS);
        let mut session = DatasetSession::default();

        session.load(&first, &range()).await.expect("first load");
        assert!(session.comparison_availability().available);

        let rows = session.load(&second, &range()).await.expect("second load");
        assert_eq!(rows.rows.len(), 2);
        assert!(!session.comparison_availability().available);
        assert_eq!(session.class_gate().map(ClassGate::class_count), Some(1));
        assert_eq!(session.rows().and_then(|set| set.delimiter), Some(b'\t'));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_dataset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = export(&dir, "a.csv", TWO_CLASSES);
        let second = export(&dir, "b.csv", ONE_CLASS);
        let mut session = DatasetSession::default();
        session.load(&first, &range()).await.expect("first load");

        let err = session
            .load(&second, &DateRange::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::RangeNotSelected));

        let err = session
            .load(&dir.path().join("missing.xlsx"), &range())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Read(_)));

        assert!(session.comparison_availability().available);
        assert_eq!(session.rows().and_then(|set| set.delimiter), Some(b';'));
    }
}
