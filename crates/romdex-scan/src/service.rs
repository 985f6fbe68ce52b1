//! Scan entry points that honor the scan gate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use romdex_core::{EngineConfig, FolderNode, MatchRecord, ScanError, ScanKind};
use romdex_index::GameIndex;

use crate::coordinator::ScanCoordinator;
use crate::extensions::ExtensionSet;
use crate::folders::FolderScanner;
use crate::pipeline::{GamePipeline, RecordSink};
use crate::progress::{ScanProgress, ScanSummary};
use crate::walker::DirectoryWalker;

/// Capacity of the progress broadcast channel.
const PROGRESS_CAPACITY: usize = 100;

/// Games and folder scans against one configuration, serialized through a
/// shared [`ScanCoordinator`].
#[derive(Debug, Clone)]
pub struct ScanService {
    config: Arc<EngineConfig>,
    coordinator: ScanCoordinator,
    progress_tx: broadcast::Sender<ScanProgress>,
}

/// Records of a running games scan plus its terminal result.
///
/// The producer blocks once `channel_capacity` records are buffered, so a
/// slow consumer slows the scan down instead of growing memory.
pub struct ScanStream {
    records: mpsc::Receiver<MatchRecord>,
    task: JoinHandle<Result<ScanSummary, ScanError>>,
}

impl ScanStream {
    /// Next record, or `None` once the scan has stopped producing.
    pub async fn recv(&mut self) -> Option<MatchRecord> {
        self.records.recv().await
    }

    /// Terminal result of the scan.
    ///
    /// Call after [`recv`](Self::recv) returned `None`. Records still
    /// unreceived are discarded, and a scan still producing stops with
    /// [`ScanError::Disconnected`].
    pub async fn finish(self) -> Result<ScanSummary, ScanError> {
        drop(self.records);
        self.task.await.map_err(|e| ScanError::Interrupted {
            reason: e.to_string(),
        })?
    }

    /// Drain every record, then return them with the terminal result.
    pub async fn collect(mut self) -> (Vec<MatchRecord>, Result<ScanSummary, ScanError>) {
        let mut records = Vec::new();
        while let Some(record) = self.recv().await {
            records.push(record);
        }
        (records, self.finish().await)
    }
}

impl ScanService {
    /// Create a service with its own gate.
    pub fn new(config: EngineConfig) -> Result<Self, ScanError> {
        Self::with_coordinator(config, ScanCoordinator::new())
    }

    /// Create a service sharing `coordinator` with other scan owners.
    pub fn with_coordinator(
        config: EngineConfig,
        coordinator: ScanCoordinator,
    ) -> Result<Self, ScanError> {
        config.check()?;
        let (progress_tx, _) = broadcast::channel(PROGRESS_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            coordinator,
            progress_tx,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &ScanCoordinator {
        &self.coordinator
    }

    /// Subscribe to progress snapshots of games scans.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Start a games scan of `base` and stream its records.
    ///
    /// The scan waits for the gate, then runs on the blocking pool. Must be
    /// called from within a tokio runtime.
    pub fn scan_games(&self, base: impl Into<PathBuf>) -> ScanStream {
        let base = base.into();
        let (tx, records) = mpsc::channel(self.config.channel_capacity);
        let config = Arc::clone(&self.config);
        let progress_tx = self.progress_tx.clone();
        let coordinator = self.coordinator.clone();

        let task = tokio::spawn(async move {
            coordinator
                .with_exclusive_scan(ScanKind::Games, move || {
                    let mut tx = tx;
                    run_games(&config, &base, &mut tx, progress_tx)
                })
                .await
        });

        ScanStream { records, task }
    }

    /// Run a games scan of `base` on the calling thread, feeding `sink`.
    ///
    /// Blocks until the gate is free. Must not be called from an async context.
    pub fn scan_games_into<S: RecordSink + ?Sized>(
        &self,
        base: &Path,
        sink: &mut S,
    ) -> Result<ScanSummary, ScanError> {
        let _permit = self.coordinator.blocking_acquire(ScanKind::Games);
        run_games(&self.config, base, sink, self.progress_tx.clone())
    }

    /// Build the folder tree below `base` with the gate held.
    pub async fn scan_folders(
        &self,
        base: impl Into<PathBuf>,
        recursive: bool,
    ) -> Result<FolderNode, ScanError> {
        let base = base.into();
        let scanner = FolderScanner::new(self.config.games_db_dir())
            .with_walker(DirectoryWalker::new().follow_links(self.config.follow_symlinks));
        self.coordinator
            .with_exclusive_scan(ScanKind::Folders, move || scanner.scan(&base, recursive))
            .await
    }
}

/// Open the index, run the pipeline and release the index on every path.
fn run_games<S: RecordSink + ?Sized>(
    config: &EngineConfig,
    base: &Path,
    sink: &mut S,
    progress_tx: broadcast::Sender<ScanProgress>,
) -> Result<ScanSummary, ScanError> {
    let index = GameIndex::open(config.databank_path())?;

    let result = {
        let pipeline = GamePipeline::new(&index)
            .with_extensions(ExtensionSet::with_extra(&config.extra_extensions))
            .with_walker(DirectoryWalker::new().follow_links(config.follow_symlinks))
            .with_progress(progress_tx);
        pipeline.run(base, sink)
    };

    let closed = index.close();
    let summary = result?;
    closed?;
    Ok(summary)
}
