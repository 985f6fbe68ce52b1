//! Core types and errors for romdex.
//!
//! This crate provides the data structures shared by the index reader, the
//! scanning engine and the command line front-end: the per-file match record,
//! the folder tree, scan configuration and the scan error taxonomy.

mod config;
mod error;
mod record;
mod tree;

pub use config::{DATABANK_FILE_NAME, EngineConfig, EngineConfigBuilder};
pub use error::ScanError;
pub use record::{MatchRecord, ScanKind};
pub use tree::FolderNode;
