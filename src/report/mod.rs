//! Rendering of analysis results.
//!
//! This module provides reporters for printing export surfaces in
//! human-readable text or as JSON.

pub mod json;
pub mod text;

use std::io::{self, Write};
use std::path::Path;

use crate::analysis::ModuleExports;
use crate::resolve::EntryExports;

/// Report format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Plain text, one file per block
    #[default]
    Text,
    /// JSON format - machine-readable, full data
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!(
                "Unknown report format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Outcome of analyzing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Single-unit analysis: the file's own exports and re-exports.
    Unit(ModuleExports),
    /// Cross-file analysis: everything reachable through re-exports.
    Entry(EntryExports),
    /// Analysis failed; the error message.
    Failed(String),
}

/// One analyzed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: String,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn new(path: &Path, outcome: FileOutcome) -> Self {
        Self {
            path: path.display().to_string(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed(_))
    }
}

/// Trait for reporters.
pub trait Reporter {
    /// Write the reports to the given writer.
    fn report<W: Write>(&self, reports: &[FileReport], writer: &mut W) -> io::Result<()>;
}

/// Write reports in the specified format.
pub fn report<W: Write>(
    format: ReportFormat,
    reports: &[FileReport],
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ReportFormat::Text => text::TextReporter.report(reports, writer),
        ReportFormat::Json => json::JsonReporter.report(reports, writer),
    }
}

/// Render reports to a string.
pub fn report_to_string(format: ReportFormat, reports: &[FileReport]) -> io::Result<String> {
    let mut buffer = Vec::new();
    report(format, reports, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
