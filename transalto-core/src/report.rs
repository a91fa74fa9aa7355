//! Per-run record of what happened to every input file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// SHA-256 of the whole input, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Written { output: PathBuf },
    /// Source already in the target language; nothing written
    SkippedSameLanguage,
    /// Nothing to translate; nothing written
    NoText,
    Failed { error: String },
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input: PathBuf,
    /// Absent when the input could not be read
    pub input_sha256: Option<String>,
    pub outcome: FileOutcome,
    /// Effective source language, once decided
    pub language: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub target_lang: String,
    pub files: Vec<FileReport>,
}

/// Outcome counts for the end-of-run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub written: usize,
    pub skipped: usize,
    pub empty: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn new(target_lang: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            target_lang: target_lang.to_string(),
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, file: FileReport) {
        self.files.push(file);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for file in &self.files {
            match file.outcome {
                FileOutcome::Written { .. } => summary.written += 1,
                FileOutcome::SkippedSameLanguage => summary.skipped += 1,
                FileOutcome::NoText => summary.empty += 1,
                FileOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| f.outcome.is_failure())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(outcome: FileOutcome) -> FileReport {
        FileReport {
            input: PathBuf::from("in.xml"),
            input_sha256: Some(fingerprint(b"in")),
            outcome,
            language: Some("cs".to_string()),
            duration_ms: 3,
        }
    }

    #[test]
    fn test_fingerprint_consistency() {
        assert_eq!(fingerprint(b"alto"), fingerprint(b"alto"));
        assert_ne!(fingerprint(b"alto 1"), fingerprint(b"alto 2"));
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut report = BatchReport::new("en");
        report.push(file(FileOutcome::Written {
            output: PathBuf::from("out/in_en.xml"),
        }));
        report.push(file(FileOutcome::SkippedSameLanguage));
        report.push(file(FileOutcome::Failed {
            error: "boom".to_string(),
        }));
        report.push(file(FileOutcome::NoText));
        assert_eq!(
            report.summary(),
            ReportSummary {
                written: 1,
                skipped: 1,
                empty: 1,
                failed: 1
            }
        );
        assert!(report.has_failures());
    }

    #[test]
    fn test_save_writes_tagged_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = BatchReport::new("en");
        report.push(file(FileOutcome::SkippedSameLanguage));
        report.finish();

        let path = dir.path().join("reports/run.json");
        report.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["files"][0]["outcome"]["status"], "skipped_same_language");
        assert_eq!(value["run_id"], report.run_id.to_string());
        assert!(value["finished_at"].is_string());
    }
}
