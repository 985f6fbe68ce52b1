//! Newline-delimited JSON persistence of scan results.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use romdex_core::{MatchRecord, ScanError};

use crate::pipeline::RecordSink;

/// Extension of per-folder results files.
pub const RESULTS_EXTENSION: &str = "jsonl";

/// Results file for a scan of `base`: the base path mirrored below
/// `games_db_dir` with a `.jsonl` suffix.
///
/// `/media/fat/games/NES` maps to `<games_db_dir>/media/fat/games/NES.jsonl`.
pub fn games_output_path(games_db_dir: &Path, base: &Path) -> PathBuf {
    let mut relative = PathBuf::new();
    for component in base.components() {
        if let Component::Normal(part) = component {
            relative.push(part);
        }
    }
    let mut file_name = relative
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    file_name.push(".");
    file_name.push(RESULTS_EXTENSION);
    relative.set_file_name(file_name);
    games_db_dir.join(relative)
}

/// Writes each record as one JSON array per line.
///
/// The file is truncated on creation. Lines written before an aborted scan
/// stay on disk.
pub struct JsonlSink {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl JsonlSink {
    /// Create (or truncate) the results file, creating parent directories.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
        }
        let file = File::create(&path).map_err(|e| ScanError::io(&path, e))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered lines and return the file path.
    pub fn finish(mut self) -> Result<PathBuf, ScanError> {
        self.writer
            .flush()
            .map_err(|e| ScanError::io(&self.path, e))?;
        Ok(self.path)
    }
}

impl RecordSink for JsonlSink {
    fn emit(&mut self, record: MatchRecord) -> Result<(), ScanError> {
        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| ScanError::io(&self.path, e.into()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| ScanError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }
}

/// Read a results file back into records.
pub fn read_results(path: &Path) -> Result<Vec<MatchRecord>, ScanError> {
    let content = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| ScanError::io(path, e.into()))
        })
        .collect()
}
