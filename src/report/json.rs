//! JSON report implementation.

use super::{FileOutcome, FileReport, Reporter};
use serde::Serialize;
use std::io::{self, Write};

/// JSON reporter implementation.
pub struct JsonReporter;

/// Serializable file entry for JSON output.
#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exports: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reexports: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    failed: usize,
}

/// Root JSON report structure.
#[derive(Serialize)]
struct JsonReport<'a> {
    summary: JsonSummary,
    files: Vec<JsonFile<'a>>,
}

impl Reporter for JsonReporter {
    fn report<W: Write>(&self, reports: &[FileReport], writer: &mut W) -> io::Result<()> {
        let files: Vec<JsonFile<'_>> = reports
            .iter()
            .map(|r| {
                let mut file = JsonFile {
                    path: &r.path,
                    exports: None,
                    reexports: None,
                    error: None,
                };
                match &r.outcome {
                    FileOutcome::Unit(unit) => {
                        file.exports = Some(&unit.exports);
                        file.reexports = Some(&unit.reexports);
                    }
                    FileOutcome::Entry(entry) => file.exports = Some(&entry.exports),
                    FileOutcome::Failed(message) => file.error = Some(message),
                }
                file
            })
            .collect();

        let report = JsonReport {
            summary: JsonSummary {
                files: reports.len(),
                failed: reports.iter().filter(|r| r.is_failure()).count(),
            },
            files,
        };

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ModuleExports;
    use crate::resolve::EntryExports;
    use std::path::Path;

    fn render(reports: &[FileReport]) -> serde_json::Value {
        let mut output = Vec::new();
        JsonReporter.report(reports, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_json_unit_report() {
        let reports = vec![FileReport::new(
            Path::new("lib/index.js"),
            FileOutcome::Unit(ModuleExports {
                exports: vec!["a".to_string()],
                reexports: vec!["./foo".to_string()],
            }),
        )];
        let parsed = render(&reports);

        assert_eq!(parsed["summary"]["files"], 1);
        assert_eq!(parsed["summary"]["failed"], 0);
        assert_eq!(parsed["files"][0]["path"], "lib/index.js");
        assert_eq!(parsed["files"][0]["exports"][0], "a");
        assert_eq!(parsed["files"][0]["reexports"][0], "./foo");
    }

    #[test]
    fn test_json_entry_and_failure() {
        let reports = vec![
            FileReport::new(
                Path::new("a.js"),
                FileOutcome::Entry(EntryExports {
                    exports: vec!["x".to_string(), "y".to_string()],
                }),
            ),
            FileReport::new(Path::new("b.js"), FileOutcome::Failed("syntax".to_string())),
        ];
        let parsed = render(&reports);

        assert_eq!(parsed["summary"]["failed"], 1);
        assert_eq!(parsed["files"][0]["exports"].as_array().unwrap().len(), 2);
        assert!(parsed["files"][0].get("reexports").is_none());
        assert_eq!(parsed["files"][1]["error"], "syntax");
        assert!(parsed["files"][1].get("exports").is_none());
    }
}
