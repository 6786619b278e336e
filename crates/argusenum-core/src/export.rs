//! Result export: the hand-off point where enriched candidates leave the
//! pipeline.

use std::path::{Path, PathBuf};

use crate::domain::{Candidate, ExportError};
use crate::obs;

/// Sink for the final candidate set.
///
/// Candidates are passed by value; after `export` returns the pipeline no
/// longer holds them.
pub trait Exporter: Send + Sync {
    /// Where records end up, for logs and the run report.
    fn target(&self) -> String;

    fn export(&self, candidates: Vec<Candidate>) -> Result<usize, ExportError>;
}

/// Writes a single pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Exporter for JsonFileExporter {
    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn export(&self, candidates: Vec<Candidate>) -> Result<usize, ExportError> {
        write_candidates_json(&self.path, &candidates)?;
        obs::emit_export_written(&self.path, candidates.len());
        Ok(candidates.len())
    }
}

/// Serialize `candidates` as a pretty JSON array (trailing newline) to `path`.
///
/// An empty slice is written as `[]`.
pub fn write_candidates_json(path: &Path, candidates: &[Candidate]) -> Result<(), ExportError> {
    let mut content = serde_json::to_string_pretty(candidates)?;
    content.push('\n');
    std::fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
