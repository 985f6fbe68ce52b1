//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information published while a games scan runs.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Candidates (files and archive members with a known extension) seen so far.
    pub candidates: u64,
    /// Content digests computed so far.
    pub digests_computed: u64,
    /// Candidates identified so far.
    pub matches: u64,
    /// Bytes read for digesting so far.
    pub bytes_hashed: u64,
    /// Candidate currently being processed.
    pub current_path: PathBuf,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            candidates: 0,
            digests_computed: 0,
            matches: 0,
            bytes_hashed: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Candidates processed per second.
    pub fn candidates_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.candidates as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Final counters of one games scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub candidates: u64,
    /// Candidates rejected by the size filter.
    pub size_rejected: u64,
    /// Archive members rejected by the CRC filter.
    pub crc_rejected: u64,
    pub digests_computed: u64,
    pub matches: u64,
    pub archives_opened: u64,
    pub bytes_hashed: u64,
    pub elapsed: Duration,
}

impl ScanSummary {
    /// Candidates that were digested but not found in the store.
    pub fn lookup_misses(&self) -> u64 {
        self.digests_computed.saturating_sub(self.matches)
    }
}

/// Counters kept by the pipeline while it runs.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    summary: ScanSummary,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            summary: ScanSummary::default(),
            current_path: PathBuf::new(),
        }
    }

    pub fn record_candidate(&mut self, path: PathBuf) {
        self.summary.candidates += 1;
        self.current_path = path;
    }

    pub fn record_size_rejected(&mut self) {
        self.summary.size_rejected += 1;
    }

    pub fn record_crc_rejected(&mut self) {
        self.summary.crc_rejected += 1;
    }

    pub fn record_digest(&mut self, bytes: u64) {
        self.summary.digests_computed += 1;
        self.summary.bytes_hashed += bytes;
    }

    pub fn record_match(&mut self) {
        self.summary.matches += 1;
    }

    pub fn record_archive(&mut self) {
        self.summary.archives_opened += 1;
    }

    /// Whether the candidate count just reached a multiple of `interval`.
    pub fn snapshot_due(&self, interval: u64) -> bool {
        interval > 0 && self.summary.candidates % interval == 0
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            candidates: self.summary.candidates,
            digests_computed: self.summary.digests_computed,
            matches: self.summary.matches,
            bytes_hashed: self.summary.bytes_hashed,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
        }
    }

    pub fn finish(self) -> ScanSummary {
        ScanSummary {
            elapsed: self.start_time.elapsed(),
            ..self.summary
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
