//! Per-run record of every artifact the exporter attempted.
//!
//! Extraction failures never abort a run; they end up here instead, so a caller
//! (or a test) can see exactly which files were written and which were not.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

/// What an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Metadata,
    Draft,
    Published,
    /// A section directory pair (content + metadata).
    Directory,
}

/// Result of one artifact attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Written,
    /// The page did not offer the fragment or surface, or it was empty.
    NotFound,
    Failed(String),
    /// Deliberately not exported (skip list, unrecognized type).
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub source_url: String,
    pub outcome: ArtifactOutcome,
}

/// Counts of outcomes over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub written: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
}

/// A node exported on a best-effort basis, e.g. one with an unrecognized type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWarning {
    pub path: PathBuf,
    pub source_url: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ExportReport {
    pub records: Vec<ArtifactRecord>,
    pub warnings: Vec<ReportWarning>,
}

impl ExportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: ArtifactKind,
        path: impl Into<PathBuf>,
        source_url: impl Into<String>,
        outcome: ArtifactOutcome,
    ) {
        self.records.push(ArtifactRecord {
            kind,
            path: path.into(),
            source_url: source_url.into(),
            outcome,
        });
    }

    pub fn warn(
        &mut self,
        path: impl Into<PathBuf>,
        source_url: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.warnings.push(ReportWarning {
            path: path.into(),
            source_url: source_url.into(),
            message: message.into(),
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, ArtifactOutcome::Failed(_)))
    }

    pub fn summary(&self) -> ReportSummary {
        let initial = ReportSummary {
            warnings: self.warnings.len(),
            ..ReportSummary::default()
        };
        self.records
            .iter()
            .fold(initial, |mut summary, record| {
                match record.outcome {
                    ArtifactOutcome::Written => summary.written += 1,
                    ArtifactOutcome::NotFound => summary.not_found += 1,
                    ArtifactOutcome::Failed(_) => summary.failed += 1,
                    ArtifactOutcome::Skipped(_) => summary.skipped += 1,
                }
                summary
            })
    }

    pub fn trace_summary(&self) {
        let summary = self.summary();
        info!(
            written = summary.written,
            not_found = summary.not_found,
            failed = summary.failed,
            skipped = summary.skipped,
            warnings = summary.warnings,
            "Export finished"
        );
    }
}
