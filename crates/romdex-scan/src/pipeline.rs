//! The games identification pipeline.
//!
//! Candidates pass through a fixed sequence of gates, cheapest first:
//!
//! 1. extension allowlist (zip containers are opened and their members
//!    treated as candidates)
//! 2. size filter, using the filesystem length or the declared member size
//! 3. CRC filter, archive members only, using the declared CRC-32
//! 4. MD5 of the full content
//! 5. exact lookup of the digest in the store
//!
//! Every candidate that reaches step 2 produces exactly one [`MatchRecord`],
//! with empty match fields when any gate rejects it.

use std::path::{Component, Path, PathBuf};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use romdex_core::{MatchRecord, ScanError};
use romdex_index::{ContentDigest, GameIndex, digest_file};

use crate::archive::{ArchiveEntry, ArchiveReader, clean_member_name};
use crate::extensions::{ExtensionSet, is_zip};
use crate::progress::{ProgressTracker, ScanProgress, ScanSummary};
use crate::walker::{DirectoryWalker, WalkDirective, WalkEntry};

/// Progress is broadcast once per this many candidates.
const PROGRESS_INTERVAL: u64 = 64;

/// Destination of the records produced by a scan.
pub trait RecordSink {
    /// Accept one record. An error aborts the scan.
    fn emit(&mut self, record: MatchRecord) -> Result<(), ScanError>;
}

impl RecordSink for Vec<MatchRecord> {
    fn emit(&mut self, record: MatchRecord) -> Result<(), ScanError> {
        self.push(record);
        Ok(())
    }
}

/// Blocks the producing thread while the channel is full.
///
/// Must not be used from inside an async context.
impl RecordSink for mpsc::Sender<MatchRecord> {
    fn emit(&mut self, record: MatchRecord) -> Result<(), ScanError> {
        self.blocking_send(record)
            .map_err(|_| ScanError::Disconnected)
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn emit(&mut self, record: MatchRecord) -> Result<(), ScanError> {
        (**self).emit(record)
    }
}

/// Single-threaded identification pass over one directory tree.
pub struct GamePipeline<'a> {
    index: &'a GameIndex,
    extensions: ExtensionSet,
    walker: DirectoryWalker,
    progress_tx: Option<broadcast::Sender<ScanProgress>>,
}

impl<'a> GamePipeline<'a> {
    pub fn new(index: &'a GameIndex) -> Self {
        Self {
            index,
            extensions: ExtensionSet::new(),
            walker: DirectoryWalker::new(),
            progress_tx: None,
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_walker(mut self, walker: DirectoryWalker) -> Self {
        self.walker = walker;
        self
    }

    /// Publish periodic progress snapshots on `tx`.
    pub fn with_progress(mut self, tx: broadcast::Sender<ScanProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Scan `base`, handing every record to `sink` in walk order.
    ///
    /// The first I/O, archive, lookup or sink error aborts the scan. Records
    /// already emitted stay with the sink.
    pub fn run<S: RecordSink + ?Sized>(
        &self,
        base: &Path,
        sink: &mut S,
    ) -> Result<ScanSummary, ScanError> {
        let metadata = std::fs::metadata(base).map_err(|e| ScanError::io(base, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: base.to_path_buf(),
            });
        }

        info!(base = %base.display(), "games scan started");
        let mut tracker = ProgressTracker::new();

        self.walker.walk(base, |entry| {
            if !entry.is_regular_file() {
                return Ok(WalkDirective::Continue);
            }
            let name = entry.file_name();
            if is_zip(&name) {
                self.scan_archive(base, entry, &mut *sink, &mut tracker)?;
            } else if self.extensions.matches(&name) {
                self.scan_file(base, entry, &mut *sink, &mut tracker)?;
            }
            Ok(WalkDirective::Continue)
        })?;

        self.publish(&tracker);
        let summary = tracker.finish();
        info!(
            base = %base.display(),
            candidates = summary.candidates,
            size_rejected = summary.size_rejected,
            crc_rejected = summary.crc_rejected,
            digests = summary.digests_computed,
            matches = summary.matches,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "games scan finished"
        );
        Ok(summary)
    }

    fn scan_file<S: RecordSink + ?Sized>(
        &self,
        base: &Path,
        entry: &WalkEntry,
        sink: &mut S,
        tracker: &mut ProgressTracker,
    ) -> Result<(), ScanError> {
        self.candidate(tracker, entry.path.clone());
        let (folder, file) = relative_location(base, &entry.path);

        let size = std::fs::metadata(&entry.path)
            .map_err(|e| ScanError::io(&entry.path, e))?
            .len();
        if !self.index.size_may_match(size) {
            tracker.record_size_rejected();
            return sink.emit(MatchRecord::unmatched(folder, file));
        }

        let (digest, read) = digest_file(&entry.path)?;
        tracker.record_digest(read);
        self.resolve(sink, tracker, folder, file, &digest)
    }

    fn scan_archive<S: RecordSink + ?Sized>(
        &self,
        base: &Path,
        entry: &WalkEntry,
        sink: &mut S,
        tracker: &mut ProgressTracker,
    ) -> Result<(), ScanError> {
        let mut archive = ArchiveReader::open(&entry.path)?;
        tracker.record_archive();
        debug!(path = %entry.path.display(), members = archive.len(), "archive opened");

        let (folder, archive_name) = relative_location(base, &entry.path);

        for index in 0..archive.len() {
            let member = archive.entry(index)?;
            if member.is_dir || !self.extensions.matches(&member.name) {
                continue;
            }
            let name = clean_member_name(&member.name);
            self.candidate(tracker, entry.path.join(&name));
            let file = format!("{archive_name}/{name}");
            self.scan_member(&mut archive, &member, &mut *sink, tracker, folder.clone(), file)?;
        }
        Ok(())
    }

    fn scan_member<S: RecordSink + ?Sized>(
        &self,
        archive: &mut ArchiveReader,
        member: &ArchiveEntry,
        sink: &mut S,
        tracker: &mut ProgressTracker,
        folder: String,
        file: String,
    ) -> Result<(), ScanError> {
        if !self.index.size_may_match(member.size) {
            tracker.record_size_rejected();
            return sink.emit(MatchRecord::unmatched(folder, file));
        }
        if !self.index.crc_may_match(member.crc32) {
            tracker.record_crc_rejected();
            return sink.emit(MatchRecord::unmatched(folder, file));
        }

        let (digest, read) = archive.digest_entry(member)?;
        tracker.record_digest(read);
        self.resolve(sink, tracker, folder, file, &digest)
    }

    fn resolve<S: RecordSink + ?Sized>(
        &self,
        sink: &mut S,
        tracker: &mut ProgressTracker,
        folder: String,
        file: String,
        digest: &ContentDigest,
    ) -> Result<(), ScanError> {
        let record = match self.index.lookup(digest)? {
            Some(stored) => {
                tracker.record_match();
                MatchRecord::matched(folder, file, stored.code, stored.name, digest.to_hex())
            }
            None => MatchRecord::unmatched(folder, file),
        };
        sink.emit(record)
    }

    fn candidate(&self, tracker: &mut ProgressTracker, path: PathBuf) {
        tracker.record_candidate(path);
        if tracker.snapshot_due(PROGRESS_INTERVAL) {
            self.publish(tracker);
        }
    }

    fn publish(&self, tracker: &ProgressTracker) {
        if let Some(tx) = &self.progress_tx {
            // No subscribers is not an error.
            let _ = tx.send(tracker.snapshot());
        }
    }
}

/// Split a walked path into the `/`-rooted folder relative to `base` and the
/// final component.
pub fn relative_location(base: &Path, path: &Path) -> (String, String) {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let file = components.pop().unwrap_or_default();
    (format!("/{}", components.join("/")), file)
}
