//! Engine configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ScanError;

/// Default mount point of the SD card holding cores and games.
pub const DEFAULT_DATA_ROOT: &str = "/media/fat";

/// File name of the databank inside the cache directory. The SQLite layout
/// is described in the `romdex-index` crate docs.
pub const DATABANK_FILE_NAME: &str = "romdex.db";

/// Default capacity of the record channel between scanner and consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration shared by every scan the engine runs.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct EngineConfig {
    /// Root of the data volume.
    #[builder(default = "PathBuf::from(DEFAULT_DATA_ROOT)")]
    pub data_root: PathBuf,

    /// Directory holding the databank and all scan outputs.
    /// Defaults to `<data_root>/.cache/WebMenu`.
    #[builder(default, setter(into, strip_option))]
    pub cache_dir: Option<PathBuf>,

    /// Read-only game databank. Defaults to `<cache_dir>/romdex.db`.
    #[builder(default, setter(into, strip_option))]
    pub databank_path: Option<PathBuf>,

    /// Directory receiving one JSONL file per scanned folder.
    /// Defaults to `<cache_dir>/games`.
    #[builder(default, setter(into, strip_option))]
    pub games_db_dir: Option<PathBuf>,

    /// Output of the folder-tree scan. Defaults to `<cache_dir>/folders.json`.
    #[builder(default, setter(into, strip_option))]
    pub folders_db_path: Option<PathBuf>,

    /// Follow symbolic links while walking.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Extensions recognized in addition to the built-in list (without the dot).
    #[builder(default)]
    pub extra_extensions: Vec<String>,

    /// Capacity of the record channel; the scanner blocks when it is full.
    #[builder(default = "DEFAULT_CHANNEL_CAPACITY")]
    pub channel_capacity: usize,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.data_root {
            if root.as_os_str().is_empty() {
                return Err("Data root cannot be empty".to_string());
            }
        }
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Create a config with every path derived from `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            cache_dir: None,
            databank_path: None,
            games_db_dir: None,
            folders_db_path: None,
            follow_symlinks: false,
            extra_extensions: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Load a config from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| ScanError::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Reject values the builder would have refused.
    pub fn check(&self) -> Result<(), ScanError> {
        if self.data_root.as_os_str().is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "Data root cannot be empty".to_string(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(ScanError::InvalidConfig {
                message: "Channel capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.data_root.join(".cache").join("WebMenu"))
    }

    pub fn databank_path(&self) -> PathBuf {
        self.databank_path
            .clone()
            .unwrap_or_else(|| self.cache_dir().join(DATABANK_FILE_NAME))
    }

    pub fn games_db_dir(&self) -> PathBuf {
        self.games_db_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir().join("games"))
    }

    pub fn folders_db_path(&self) -> PathBuf {
        self.folders_db_path
            .clone()
            .unwrap_or_else(|| self.cache_dir().join("folders.json"))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ROOT)
    }
}
