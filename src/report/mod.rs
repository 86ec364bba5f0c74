//! Dual-stream logging and report artifacts (spec §6).
//!
//! Grounded on `iepathos-debtmap/src/io/output.rs`'s `OutputWriter`
//! abstraction — a writer that can target stdout or a file uniformly —
//! generalized here to write to *both at once*, since spec §6 requires the
//! combined log and the file dump to carry identical content rather than a
//! choice of one.

mod analysis_dump;
mod reaching_dump;

pub use analysis_dump::render_analysis_dump;
pub use reaching_dump::render_reaching_dump;

use crate::error::AnalyzerError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Tees every line written to it to both stdout and a file, so the combined
/// log (`<basename>_output.txt`) and what the operator sees on the terminal
/// always carry the same content (spec §6 "The two streams contain the same
/// content").
pub struct ReportWriter {
    file: File,
    path: PathBuf,
}

impl ReportWriter {
    /// Opens (overwriting) `<basename>_output.txt` alongside `input_path`.
    pub fn for_input(input_path: &Path) -> Result<Self, AnalyzerError> {
        let path = sibling_path(input_path, "_output.txt");
        let file = File::create(&path).map_err(|e| AnalyzerError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { file, path })
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), AnalyzerError> {
        println!("{line}");
        writeln!(self.file, "{line}").map_err(|e| AnalyzerError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn write_block(&mut self, text: &str) -> Result<(), AnalyzerError> {
        for line in text.lines() {
            self.write_line(line)?;
        }
        Ok(())
    }
}

/// Writes a report artifact's full text to `<basename><suffix>` alongside
/// `input_path`, overwriting any prior run's output (spec §6 "overwritten per
/// run").
pub fn write_artifact(input_path: &Path, suffix: &str, content: &str) -> Result<PathBuf, AnalyzerError> {
    let path = sibling_path(input_path, suffix);
    std::fs::write(&path, content).map_err(|e| AnalyzerError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

fn sibling_path(input_path: &Path, suffix: &str) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_replaces_extension_with_suffix() {
        let path = sibling_path(Path::new("/tmp/foo/Bank.sol"), "_analysis.txt");
        assert_eq!(path, PathBuf::from("/tmp/foo/Bank_analysis.txt"));
    }
}
