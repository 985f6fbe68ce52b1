//! Game identification scanning engine for romdex.
//!
//! A games scan walks a directory tree, screens every candidate file and
//! zip member against the approximate size and CRC filters of the
//! [`GameIndex`](romdex_index::GameIndex), digests whatever survives and
//! looks the digest up in the store. One [`MatchRecord`](romdex_core::MatchRecord)
//! is emitted per candidate, matched or not.
//!
//! All tree scans (games and folder discovery) are serialized through a
//! [`ScanCoordinator`].
//!
//! # Example
//!
//! ```rust,no_run
//! use romdex_scan::{EngineConfig, ScanService};
//!
//! # async fn run() -> Result<(), romdex_scan::ScanError> {
//! let service = ScanService::new(EngineConfig::default())?;
//! let mut stream = service.scan_games("/media/fat/games/NES");
//! while let Some(record) = stream.recv().await {
//!     if record.is_match() {
//!         println!("{}/{}: {}", record.folder, record.file, record.name);
//!     }
//! }
//! let summary = stream.finish().await?;
//! println!("{} of {} candidates identified", summary.matches, summary.candidates);
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! # use romdex_scan::{EngineConfig, ScanService};
//! # let service = ScanService::new(EngineConfig::default()).unwrap();
//! let mut progress_rx = service.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{} candidates, {} digests", progress.candidates, progress.digests_computed);
//!     }
//! });
//! ```

mod archive;
mod coordinator;
mod extensions;
mod folders;
mod pipeline;
mod progress;
mod service;
mod sink;
mod walker;

pub use archive::{ArchiveEntry, ArchiveReader, Entries, clean_member_name};
pub use coordinator::{ScanCoordinator, ScanPermit};
pub use extensions::{DEFAULT_EXTENSIONS, ExtensionSet, ZIP_EXTENSION, extension_of, is_zip};
pub use folders::FolderScanner;
pub use pipeline::{GamePipeline, RecordSink, relative_location};
pub use progress::{ScanProgress, ScanSummary};
pub use service::{ScanService, ScanStream};
pub use sink::{JsonlSink, RESULTS_EXTENSION, games_output_path, read_results};
pub use walker::{DirectoryWalker, EntryKind, WalkDirective, WalkEntry};

// Re-export core types for convenience
pub use romdex_core::{EngineConfig, FolderNode, MatchRecord, ScanError, ScanKind};
