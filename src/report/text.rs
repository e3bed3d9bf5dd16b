//! Plain-text report implementation.

use super::{FileOutcome, FileReport, Reporter};
use std::io::{self, Write};

/// Text reporter implementation.
pub struct TextReporter;

fn write_list<W: Write>(writer: &mut W, label: &str, items: &[String]) -> io::Result<()> {
    if items.is_empty() {
        writeln!(writer, "  {}: (none)", label)
    } else {
        writeln!(writer, "  {}: {}", label, items.join(", "))
    }
}

impl Reporter for TextReporter {
    fn report<W: Write>(&self, reports: &[FileReport], writer: &mut W) -> io::Result<()> {
        for r in reports {
            writeln!(writer, "{}", r.path)?;
            match &r.outcome {
                FileOutcome::Unit(unit) => {
                    write_list(writer, "exports", &unit.exports)?;
                    write_list(writer, "reexports", &unit.reexports)?;
                }
                FileOutcome::Entry(entry) => write_list(writer, "exports", &entry.exports)?,
                FileOutcome::Failed(message) => writeln!(writer, "  error: {}", message)?,
            }
        }

        let failed = reports.iter().filter(|r| r.is_failure()).count();
        if reports.len() > 1 {
            writeln!(writer)?;
            writeln!(writer, "{} files, {} failed", reports.len(), failed)?;
        }
        Ok(())
    }
}
